use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::article::{ArticleRef, GridCell, SessionKind};
use crate::title::NormalizedTitle;
use crate::winline::{self, GRID_SIZE};

/// The single mutable aggregate for one game.
///
/// All mutation goes through the engine, which serializes access behind one
/// mutex; the session itself is plain data. `winning_cells` and `won` are
/// derived from `matched` via [`GameSession::recompute_win_state`] and never
/// edited directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub started: bool,
    pub won: bool,
    /// The 25 bingo cells, row-major. Length is invariant.
    pub grid: Vec<GridCell>,
    /// Article the player begins navigating from.
    pub starting_article: Option<ArticleRef>,
    /// Normalized titles of grid articles the player has visited.
    /// Grows monotonically until a new game starts.
    pub matched: HashSet<NormalizedTitle>,
    /// Indices of cells on completed lines. Derived from `matched`.
    pub winning_cells: BTreeSet<usize>,
    /// Accepted navigations. Duplicate and concurrent clicks do not count.
    pub clicks: u32,
    pub elapsed_seconds: u64,
    pub timer_running: bool,
    pub article_loading: bool,
    /// Visited titles in order. May contain repeats (revisits via repair).
    pub history: Vec<String>,
    pub current_article_title: Option<String>,
    /// Identifier of the stored game this session was loaded from or
    /// published as, if any.
    pub session_id: Option<String>,
    pub session_kind: SessionKind,
    pub created_at: DateTime<Utc>,

    /// Identity of this session instance within its engine. Bumped every
    /// time the engine replaces the aggregate, so pipelines suspended across
    /// a replacement can tell the fresh session from the one they started
    /// in and discard their stale commits.
    #[serde(skip)]
    pub epoch: u64,
    /// At most one navigation may be inside its critical section at a time;
    /// a second click arriving while this is set is dropped, not queued.
    #[serde(skip)]
    pub navigation_in_flight: bool,
    /// Normalized titles with a repair in flight. Keys repairs so duplicate
    /// failure reports for the same article collapse to one replacement.
    #[serde(skip)]
    pub repairs_in_flight: HashSet<NormalizedTitle>,
}

impl GameSession {
    /// Fresh, not-yet-started session with an empty board.
    pub fn new(kind: SessionKind) -> Self {
        Self {
            started: false,
            won: false,
            grid: Vec::new(),
            starting_article: None,
            matched: HashSet::new(),
            winning_cells: BTreeSet::new(),
            clicks: 0,
            elapsed_seconds: 0,
            timer_running: false,
            article_loading: false,
            history: Vec::new(),
            current_article_title: None,
            session_id: None,
            session_kind: kind,
            created_at: Utc::now(),
            epoch: 0,
            navigation_in_flight: false,
            repairs_in_flight: HashSet::new(),
        }
    }

    /// Started session over a 25-cell board plus starting article.
    pub fn with_board(
        kind: SessionKind,
        articles: Vec<ArticleRef>,
        starting_article: ArticleRef,
    ) -> Self {
        debug_assert_eq!(articles.len(), GRID_SIZE);
        let grid = articles
            .into_iter()
            .enumerate()
            .map(|(i, article)| GridCell::new(i, article))
            .collect();
        Self {
            started: true,
            grid,
            // The player begins on the starting article; it is on screen but
            // not a navigation, so history stays empty.
            current_article_title: Some(starting_article.title.clone()),
            starting_article: Some(starting_article),
            ..Self::new(kind)
        }
    }

    /// Re-derive `winning_cells` and `won` from `matched`.
    ///
    /// Returns true if this call transitioned the session into the won state.
    pub fn recompute_win_state(&mut self) -> bool {
        let was_won = self.won;
        self.winning_cells = winline::detect_winning_cells(&self.grid, &self.matched);
        self.won = !self.winning_cells.is_empty();
        if self.won {
            // Winning (or having won) keeps the clock stopped.
            self.timer_running = false;
        }
        self.won && !was_won
    }

    /// Record a visited grid title. Returns false if already matched.
    pub fn add_match(&mut self, key: NormalizedTitle) -> bool {
        self.matched.insert(key)
    }

    /// Index of the grid cell whose title normalizes to `key`, if any.
    pub fn cell_index_of(&self, key: &NormalizedTitle) -> Option<usize> {
        self.grid.iter().position(|cell| cell.article.key() == *key)
    }

    /// Normalized key of the most recent history entry.
    pub fn last_history_key(&self) -> Option<NormalizedTitle> {
        self.history
            .last()
            .map(|title| NormalizedTitle::from_raw(title))
    }

    /// Normalized key of the article currently on screen.
    pub fn current_key(&self) -> Option<NormalizedTitle> {
        self.current_article_title
            .as_deref()
            .map(NormalizedTitle::from_raw)
    }

    /// Normalized titles currently occupying the board and the starting
    /// article. Used as the exclusion set for replacement draws.
    pub fn occupied_keys(&self) -> HashSet<NormalizedTitle> {
        let mut keys: HashSet<NormalizedTitle> =
            self.grid.iter().map(|cell| cell.article.key()).collect();
        if let Some(start) = &self.starting_article {
            keys.insert(start.key());
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (Vec<ArticleRef>, ArticleRef) {
        let articles = (0..GRID_SIZE)
            .map(|i| ArticleRef::new(format!("Article{i}")))
            .collect();
        (articles, ArticleRef::new("Start"))
    }

    #[test]
    fn test_with_board_invariants() {
        let (articles, start) = board();
        let session = GameSession::with_board(SessionKind::Random, articles, start);
        assert!(session.started);
        assert!(!session.won);
        assert_eq!(session.grid.len(), GRID_SIZE);
        assert_eq!(session.grid[7].id, "cell-7");
        assert_eq!(session.clicks, 0);
        assert!(session.matched.is_empty());
        assert_eq!(session.current_article_title.as_deref(), Some("Start"));
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_recompute_win_state_transition() {
        let (articles, start) = board();
        let mut session = GameSession::with_board(SessionKind::Random, articles, start);
        session.timer_running = true;

        for i in 0..4 {
            session.add_match(NormalizedTitle::from_raw(&format!("article{i}")));
        }
        assert!(!session.recompute_win_state());
        assert!(!session.won);
        assert!(session.timer_running);

        session.add_match(NormalizedTitle::from_raw("article4"));
        assert!(session.recompute_win_state());
        assert!(session.won);
        assert!(!session.timer_running);

        // Already won: not a new transition.
        assert!(!session.recompute_win_state());
    }

    #[test]
    fn test_occupied_keys_include_starting_article() {
        let (articles, start) = board();
        let session = GameSession::with_board(SessionKind::Random, articles, start);
        let keys = session.occupied_keys();
        assert_eq!(keys.len(), GRID_SIZE + 1);
        assert!(keys.contains(&NormalizedTitle::from_raw("start")));
    }

    #[test]
    fn test_serialized_session_omits_in_flight_state() {
        let (articles, start) = board();
        let mut session = GameSession::with_board(SessionKind::Random, articles, start);
        session.epoch = 7;
        session.navigation_in_flight = true;
        session
            .repairs_in_flight
            .insert(NormalizedTitle::from_raw("article0"));

        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("epoch").is_none());
        assert!(value.get("navigation_in_flight").is_none());
        assert!(value.get("repairs_in_flight").is_none());
        assert_eq!(value["grid"].as_array().unwrap().len(), GRID_SIZE);

        // A captured session resumes with clean in-flight state.
        let restored: GameSession = serde_json::from_value(value).unwrap();
        assert_eq!(restored.epoch, 0);
        assert!(!restored.navigation_in_flight);
        assert!(restored.repairs_in_flight.is_empty());
        assert_eq!(restored.current_article_title.as_deref(), Some("Start"));
    }

    #[test]
    fn test_cell_index_of_is_normalized() {
        let (articles, start) = board();
        let session = GameSession::with_board(SessionKind::Random, articles, start);
        assert_eq!(
            session.cell_index_of(&NormalizedTitle::from_raw("ARTICLE3")),
            Some(3)
        );
        assert_eq!(
            session.cell_index_of(&NormalizedTitle::from_raw("missing")),
            None
        );
    }
}
