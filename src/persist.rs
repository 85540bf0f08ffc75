//! Shareable and replayable games.
//!
//! A stored game is a flat list of 26 titles: elements 0..25 are the grid
//! cells in row-major order, element 25 is the starting article. The store
//! itself (a CRUD API in production) sits behind [`GameStore`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::ArticleRef;
use crate::pool::BOARD_SIZE;

/// Wire shape of a stored game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGame {
    /// 26 titles: 25 grid cells, then the starting article.
    pub grid: Vec<String>,
}

impl StoredGame {
    /// Flatten a board into the stored layout.
    pub fn from_board(grid: &[ArticleRef], starting_article: &ArticleRef) -> Self {
        let mut titles: Vec<String> = grid.iter().map(|a| a.title.clone()).collect();
        titles.push(starting_article.title.clone());
        Self { grid: titles }
    }

    /// Split into grid articles and starting article, validating the layout.
    pub fn into_parts(self) -> Result<(Vec<ArticleRef>, ArticleRef), EngineError> {
        if self.grid.len() != BOARD_SIZE {
            return Err(EngineError::InvalidStoredGrid {
                len: self.grid.len(),
                expected: BOARD_SIZE,
            });
        }
        let mut titles = self.grid;
        let starting = ArticleRef::new(titles.pop().expect("length checked"));
        let grid = titles.into_iter().map(ArticleRef::new).collect();
        Ok((grid, starting))
    }
}

/// Persistence collaborator for shareable sessions.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Fetch a stored game by id. `Ok(None)` means the id is unknown.
    async fn fetch_game(&self, id: &str) -> Result<Option<StoredGame>>;

    /// Persist a game, returning its new id.
    async fn create_game(&self, game: &StoredGame) -> Result<String>;
}

/// In-memory store, for tests and offline play.
#[derive(Default)]
pub struct MemoryStore {
    games: tokio::sync::RwLock<std::collections::HashMap<String, StoredGame>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn fetch_game(&self, id: &str) -> Result<Option<StoredGame>> {
        let games = self.games.read().await;
        Ok(games.get(id).cloned())
    }

    async fn create_game(&self, game: &StoredGame) -> Result<String> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let id = format!("game-{id}");
        let mut games = self.games.write().await;
        games.insert(id.clone(), game.clone());
        Ok(id)
    }
}
