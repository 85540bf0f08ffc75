//! The navigation pipeline.
//!
//! One entry point for "the player followed a link to title T". The pipeline
//! is strictly sequential within a call; across calls, the in-flight flag on
//! the session guarantees at most one navigation inside the critical section.
//! A second click arriving mid-flight is dropped, not queued - the player
//! re-clicks once the first navigation lands.
//!
//! Matching is checked twice, because redirect equivalence is bidirectional:
//! phase one compares the clicked title (and its canonical form) against the
//! grid as stored; phase two resolves every grid cell's own redirect target
//! and compares again, catching boards that store an alias of the page the
//! player actually visited. Grid resolution is idempotent and served from the
//! resolver's shared cache, so re-running it per click is cheap.

use futures::future::join_all;
use tracing::debug;

use super::GameEngine;
use crate::events::{MatchEvent, MatchPhase};
use crate::resolve::resolve_or_fallback;
use crate::title::NormalizedTitle;

/// What a `navigate` call did, for the caller that wants to react inline
/// (the same matches are also emitted on the engine's event channel).
#[derive(Debug, Clone, Default)]
pub struct NavigationOutcome {
    /// False when the call was dropped: navigation already in flight,
    /// duplicate of the current article, or re-click of the last history
    /// entry. Dropped calls change nothing and cost no click.
    pub accepted: bool,
    /// Canonical (post-redirect) title the session navigated to.
    pub canonical_title: Option<String>,
    /// Grid cells newly claimed by this navigation, pipeline order.
    pub newly_matched: Vec<MatchEvent>,
    /// Whether the session is won after this navigation.
    pub won: bool,
}

impl NavigationOutcome {
    fn dropped() -> Self {
        Self::default()
    }
}

impl GameEngine {
    /// Navigate to `title`. Fire-and-forget from the caller's perspective:
    /// every failure mode inside degrades to a fallback, never an error.
    pub async fn navigate(&self, title: &str) -> NavigationOutcome {
        // Admission: reject duplicates, drop concurrent calls, then claim
        // the in-flight flag. One lock scope so two callers cannot both pass.
        let clicked_key = NormalizedTitle::from_raw(title);
        let epoch = {
            let mut session = self.session_mutex().lock().await;
            if !session.started {
                debug!("navigation to {title:?} ignored: no game in progress");
                return NavigationOutcome::dropped();
            }
            if session.navigation_in_flight {
                debug!("navigation to {title:?} dropped: another navigation in flight");
                return NavigationOutcome::dropped();
            }
            let duplicate = session.current_key() == Some(clicked_key.clone())
                || session.last_history_key() == Some(clicked_key.clone());
            if duplicate {
                debug!("navigation to {title:?} ignored: already current");
                return NavigationOutcome::dropped();
            }
            session.navigation_in_flight = true;
            session.epoch
        };

        let outcome = self.run_pipeline(title, &clicked_key, epoch).await;

        // Always executed: the pipeline has no early exits that skip it. The
        // epoch check keeps a stale release from clobbering the flag of a
        // session that replaced ours while we were resolving.
        let mut session = self.session_mutex().lock().await;
        if session.epoch == epoch {
            session.navigation_in_flight = false;
        }
        outcome
    }

    /// Steps 4-8 of the pipeline: resolution, state commit, the two match
    /// phases, and notification. Infallible by construction. `epoch` is the
    /// session identity captured at admission; if the session gets replaced
    /// while a resolution is in flight, the pipeline drops its remaining
    /// commits instead of writing into the fresh session.
    async fn run_pipeline(
        &self,
        title: &str,
        clicked_key: &NormalizedTitle,
        epoch: u64,
    ) -> NavigationOutcome {
        let timeout = self.engine_config().resolve_timeout();
        let canonical =
            resolve_or_fallback(self.resolver().as_ref(), title, timeout).await;
        let canonical_key = NormalizedTitle::from_raw(&canonical);

        let mut newly_matched = Vec::new();

        // Commit the accepted navigation and take the direct matches, all
        // under one lock acquisition.
        let grid_titles: Vec<(usize, String)> = {
            let mut session = self.session_mutex().lock().await;
            if session.epoch != epoch {
                debug!("session replaced while resolving {title:?}, dropping navigation");
                return NavigationOutcome::dropped();
            }
            session.clicks += 1;
            session.history.push(canonical.clone());
            session.current_article_title = Some(canonical.clone());
            session.article_loading = true;
            session.timer_running = false;

            for index in 0..session.grid.len() {
                let cell_key = session.grid[index].article.key();
                if cell_key != *clicked_key && cell_key != canonical_key {
                    continue;
                }
                if session.add_match(cell_key.clone()) {
                    newly_matched.push(MatchEvent {
                        title: cell_key,
                        cell_index: Some(index),
                        phase: MatchPhase::Direct,
                    });
                }
            }
            session.recompute_win_state();
            self.sync_clock(&mut session);

            session
                .grid
                .iter()
                .enumerate()
                .map(|(i, cell)| (i, cell.article.title.clone()))
                .collect()
        };

        // Phase two: the grid article itself may be a redirect alias of the
        // visited page. Resolve every cell and compare again.
        let resolved = join_all(grid_titles.iter().map(|(_, cell_title)| {
            resolve_or_fallback(self.resolver().as_ref(), cell_title, timeout)
        }))
        .await;

        let won = {
            let mut session = self.session_mutex().lock().await;
            if session.epoch != epoch {
                debug!("session replaced while resolving grid for {title:?}, dropping matches");
                return NavigationOutcome::dropped();
            }
            for ((index, cell_title), resolved_title) in grid_titles.iter().zip(resolved) {
                let resolved_key = NormalizedTitle::from_raw(&resolved_title);
                if resolved_key != *clicked_key && resolved_key != canonical_key {
                    continue;
                }
                // Stale guard: a repair may have swapped the cell while we
                // were resolving. Only claim it if the title still stands.
                let Some(cell) = session.grid.get(*index) else {
                    continue;
                };
                if cell.article.title != *cell_title {
                    debug!("cell {index} changed during resolution, skipping match");
                    continue;
                }
                let cell_key = cell.article.key();
                if session.add_match(cell_key.clone()) {
                    newly_matched.push(MatchEvent {
                        title: cell_key,
                        cell_index: Some(*index),
                        phase: MatchPhase::RedirectAware,
                    });
                }
            }
            session.recompute_win_state();
            self.sync_clock(&mut session);
            session.won
        };

        // One notification per newly claimed cell, direct matches first.
        // Each send is fault-isolated inside the notifier.
        for event in &newly_matched {
            self.notifier().notify(event.clone());
        }

        NavigationOutcome {
            accepted: true,
            canonical_title: Some(canonical),
            newly_matched,
            won,
        }
    }
}
