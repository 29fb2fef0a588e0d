//! Error types for ibx-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("Nonexistent local wall-clock time for timestamp {0}")]
    NonexistentLocalTime(i64),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
