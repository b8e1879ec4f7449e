//! Error types for milestone-feed

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    /// Read or write failure in the activity / feed store.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A state the pipeline guarantees can never happen did happen.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Shared connection lock poisoned")]
    LockPoisoned,

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Storage failures are expected to clear up by the next sweep.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
