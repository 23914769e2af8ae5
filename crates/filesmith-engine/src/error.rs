//! Engine error types.

use filesmith_history::{HistoryError, OperationId};
use std::path::Path;
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors produced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Target or comparison file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Line bounds outside the valid range for the current file.
    #[error("Invalid line range: {0}")]
    InvalidRange(String),

    /// Create without overwrite against an existing file.
    #[error("File already exists: {0} (pass overwrite to replace it)")]
    AlreadyExists(String),

    /// Malformed search pattern.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Unrecognized operation selector.
    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    /// Collaborator call failed, timed out, or returned malformed output.
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    /// History lookup or restore failure.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound(path.as_ref().display().to_string())
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }

    pub fn already_exists(path: impl AsRef<Path>) -> Self {
        Self::AlreadyExists(path.as_ref().display().to_string())
    }

    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern(message.into())
    }

    pub fn unknown_operation(selector: impl Into<String>) -> Self {
        Self::UnknownOperation(selector.into())
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }
}

/// A mutation failure carrying the operation id, so the caller can still
/// attempt a rollback or correlate logs.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct MutationError {
    pub operation_id: OperationId,
    #[source]
    pub source: EngineError,
}

impl MutationError {
    pub fn new(operation_id: OperationId, source: EngineError) -> Self {
        Self {
            operation_id,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::not_found("/tmp/missing.txt");
        assert_eq!(err.to_string(), "File not found: /tmp/missing.txt");

        let err = EngineError::invalid_range("start line 5 exceeds file length 3");
        assert!(err.to_string().contains("start line 5"));

        let err = EngineError::unknown_operation("frobnicate");
        assert_eq!(err.to_string(), "Unknown operation type: frobnicate");
    }

    #[test]
    fn test_mutation_error_preserves_id() {
        let id = OperationId::new();
        let err = MutationError::new(id.clone(), EngineError::invalid_range("bad"));
        assert_eq!(err.operation_id, id);
        assert_eq!(err.to_string(), "Invalid line range: bad");
    }
}
