use thiserror::Error;

/// Errors surfaced by the engine's lifecycle and persistence operations.
///
/// The navigation and repair paths never return these: their failures are
/// absorbed into fallbacks or logged no-ops so nothing escapes the engine's
/// public operations mid-game.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no game in progress")]
    NotStarted,

    #[error("stored game {id} not found")]
    GameNotFound { id: String },

    #[error("stored grid has {len} entries, expected {expected}")]
    InvalidStoredGrid { len: usize, expected: usize },

    #[error("curated article pool unavailable: {source}")]
    PoolUnavailable {
        #[source]
        source: anyhow::Error,
    },

    #[error("curated pool cannot fill a board of {needed} distinct articles")]
    PoolExhausted { needed: usize },

    #[error("game store error: {source}")]
    Store {
        #[source]
        source: anyhow::Error,
    },
}
