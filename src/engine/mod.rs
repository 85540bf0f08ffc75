//! Game State Engine - single owner of a game session.
//!
//! All mutation of the [`GameSession`] aggregate is serialized through one
//! async mutex held by the engine; collaborators (redirect resolver, curated
//! pool, game store) are consumed behind trait objects so the engine stays
//! independent of transports. The UI layer reads snapshots and calls the
//! public operations; nothing here ever panics out of a public operation
//! mid-game.

mod navigation;
mod repair;

pub use navigation::NavigationOutcome;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::thread_rng;
use tokio::sync::mpsc::Receiver;
use tokio::sync::Mutex;
use tracing::info;

use crate::clock::GameClock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{MatchEvent, MatchNotifier};
use crate::models::{GameSession, SessionKind};
use crate::persist::{GameStore, StoredGame};
use crate::pool::{self, ArticleSource};
use crate::resolve::RedirectResolver;

pub struct GameEngine {
    session: Mutex<GameSession>,
    clock: GameClock,
    config: EngineConfig,
    resolver: Arc<dyn RedirectResolver>,
    source: Arc<dyn ArticleSource>,
    store: Arc<dyn GameStore>,
    notifier: MatchNotifier,
    match_rx: std::sync::Mutex<Option<Receiver<MatchEvent>>>,
    /// Source of session epochs. Each replacement stamps the fresh session
    /// with the next value, so pipelines suspended across the swap can tell
    /// they are committing into a session the player no longer sees.
    epoch: AtomicU64,
}

impl GameEngine {
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn RedirectResolver>,
        source: Arc<dyn ArticleSource>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        let (notifier, rx) = MatchNotifier::channel(config.event_buffer);
        Self {
            session: Mutex::new(GameSession::new(SessionKind::Random)),
            clock: GameClock::new(config.tick_interval()),
            config,
            resolver,
            source,
            store,
            notifier,
            match_rx: std::sync::Mutex::new(Some(rx)),
            epoch: AtomicU64::new(0),
        }
    }

    /// Receiving half of the match-event channel. Yields `Some` once; the
    /// engine works fine if nobody ever takes it.
    pub fn match_events(&self) -> Option<Receiver<MatchEvent>> {
        self.match_rx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Start a fresh game on a randomly drawn board.
    ///
    /// Discards the previous session wholesale; the clock restarts from zero
    /// and stays stopped until the first article finishes loading.
    pub async fn start_new_game(&self) -> Result<(), EngineError> {
        let curated = self
            .source
            .load_pool()
            .await
            .map_err(|source| EngineError::PoolUnavailable { source })?;
        let board = pool::generate_board(&curated, &mut thread_rng())?;

        let mut fresh =
            GameSession::with_board(SessionKind::Random, board.grid, board.starting_article);
        // The UI is about to load the starting article.
        fresh.article_loading = true;
        info!(
            "new game started, starting article {:?}",
            fresh.starting_article.as_ref().map(|a| a.title.as_str())
        );
        self.replace_session(fresh).await;
        Ok(())
    }

    /// Start a game on the board stored under `id` (shared/replay link).
    pub async fn load_game_from_id(&self, id: &str) -> Result<(), EngineError> {
        let stored = self
            .store
            .fetch_game(id)
            .await
            .map_err(|source| EngineError::Store { source })?
            .ok_or_else(|| EngineError::GameNotFound { id: id.to_string() })?;
        let (grid, starting_article) = stored.into_parts()?;

        let mut fresh = GameSession::with_board(SessionKind::Repeat, grid, starting_article);
        fresh.article_loading = true;
        fresh.session_id = Some(id.to_string());
        info!("loaded stored game {id}");
        self.replace_session(fresh).await;
        Ok(())
    }

    /// Resume play from a previously captured session (replay).
    pub async fn resume_from_session(&self, session: GameSession) {
        info!(
            "resuming session (clicks {}, elapsed {}s)",
            session.clicks, session.elapsed_seconds
        );
        self.replace_session(session).await;
    }

    /// Persist the current board so it can be shared, returning the new id.
    pub async fn create_shareable_game(&self) -> Result<String, EngineError> {
        let stored = {
            let session = self.session.lock().await;
            if !session.started {
                return Err(EngineError::NotStarted);
            }
            let starting = session
                .starting_article
                .as_ref()
                .ok_or(EngineError::NotStarted)?;
            let grid: Vec<_> = session
                .grid
                .iter()
                .map(|cell| cell.article.clone())
                .collect();
            StoredGame::from_board(&grid, starting)
        };

        let id = self
            .store
            .create_game(&stored)
            .await
            .map_err(|source| EngineError::Store { source })?;

        let mut session = self.session.lock().await;
        session.session_id = Some(id.clone());
        info!("published game as {id}");
        Ok(id)
    }

    // ========================================================================
    // Loading gate
    // ========================================================================

    /// Report from the rendering layer that the current article started or
    /// finished loading. Loading always pauses the clock; a finished load
    /// (re)starts it unless the game is already won. The very first finished
    /// load after session start is what begins timing.
    pub async fn set_article_loading(&self, loading: bool) {
        let mut session = self.session.lock().await;
        if !session.started {
            return;
        }
        let was_loading = session.article_loading;
        session.article_loading = loading;
        if loading {
            session.timer_running = false;
        } else if was_loading && !session.won {
            session.timer_running = true;
        }
        self.sync_clock(&mut session);
    }

    /// Read-only copy of the session with the clock reading folded in.
    pub async fn snapshot(&self) -> GameSession {
        let mut session = self.session.lock().await;
        session.elapsed_seconds = self.clock.elapsed_seconds();
        session.clone()
    }

    // ========================================================================
    // Internals shared by the navigation and repair pipelines
    // ========================================================================

    async fn replace_session(&self, mut fresh: GameSession) {
        let mut session = self.session.lock().await;
        // Stamp the new identity. A navigation or repair that was admitted
        // against the old session compares its captured epoch on reacquiring
        // the lock and drops its commits when the numbers disagree.
        fresh.epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.clock.reset();
        self.clock.set_elapsed(fresh.elapsed_seconds);
        *session = fresh;
        self.sync_clock(&mut session);
    }

    pub(crate) fn sync_clock(&self, session: &mut GameSession) {
        self.clock
            .update(session.timer_running, session.article_loading, session.won);
        session.elapsed_seconds = self.clock.elapsed_seconds();
    }

    pub(crate) fn session_mutex(&self) -> &Mutex<GameSession> {
        &self.session
    }

    pub(crate) fn notifier(&self) -> &MatchNotifier {
        &self.notifier
    }

    pub(crate) fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn RedirectResolver> {
        &self.resolver
    }

    pub(crate) fn source(&self) -> &Arc<dyn ArticleSource> {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;

    use anyhow::bail;
    use async_trait::async_trait;

    use super::*;
    use crate::persist::MemoryStore;
    use crate::pool::CuratedPool;
    use crate::resolve::IdentityResolver;

    struct NoSource;

    #[async_trait]
    impl ArticleSource for NoSource {
        async fn load_pool(&self) -> anyhow::Result<CuratedPool> {
            bail!("no pool in this test")
        }
    }

    fn engine() -> GameEngine {
        GameEngine::new(
            EngineConfig::default(),
            Arc::new(IdentityResolver),
            Arc::new(NoSource),
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_match_events_yields_receiver_once() {
        let engine = engine();
        assert!(engine.match_events().is_some());
        assert!(engine.match_events().is_none());
    }

    #[test]
    fn test_match_events_recovers_from_poisoned_lock() {
        let engine = engine();
        // Panic while holding the receiver lock to poison it.
        let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = engine.match_rx.lock().unwrap();
            panic!("poison");
        }));
        assert!(engine.match_rx.lock().is_err());
        assert!(engine.match_events().is_some());
    }
}
