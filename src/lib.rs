pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod persist;
pub mod pool;
pub mod resolve;
pub mod title;
pub mod winline;

// Re-export main types
pub use clock::GameClock;
pub use config::EngineConfig;
pub use engine::{GameEngine, NavigationOutcome};
pub use error::EngineError;
pub use events::{MatchEvent, MatchPhase};
pub use models::{ArticleRef, GameSession, GridCell, SessionKind};
pub use persist::{GameStore, MemoryStore, StoredGame};
pub use pool::{ArticleSource, BoardDraw, Category, CuratedPool, GroupConstraints};
pub use resolve::{CachingResolver, IdentityResolver, RedirectResolver};
pub use title::NormalizedTitle;
pub use winline::{detect_winning_cells, GRID_SIZE, WIN_LINES};
