//! History error types.

use thiserror::Error;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Operation not found in the registry.
    #[error("Operation not found: {0}")]
    NotFound(String),

    /// The record carries no snapshot to restore from.
    #[error("No snapshot recorded for operation: {0}")]
    MissingSnapshot(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a missing snapshot error.
    pub fn missing_snapshot(id: impl Into<String>) -> Self {
        Self::MissingSnapshot(id.into())
    }
}
