//! Error types for the relaychat-store crate.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The saved transcript could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The database directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
