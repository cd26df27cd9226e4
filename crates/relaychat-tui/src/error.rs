//! TUI error types.

use thiserror::Error;

/// Unified error type for the terminal UI.
#[derive(Error, Debug)]
pub enum TuiError {
    /// An I/O operation failed (raw mode, drawing, reading events).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The saved conversation could not be read.
    #[error("store error: {0}")]
    Store(#[from] relaychat_store::StoreError),
}

/// Convenience alias used throughout the TUI crate.
pub type Result<T> = std::result::Result<T, TuiError>;
