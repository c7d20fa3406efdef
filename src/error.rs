//! Core error types
//!
//! Every fallible core operation returns a typed error so the CLI layer can
//! decide exit codes and messages without string-matching. Corruption recovery
//! is deliberately not here: the store reports it as a value alongside the
//! recovered session, not as a failure.

use thiserror::Error;

/// Errors returned by the core services
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Check whether this error left state unmodified
    ///
    /// NotFound and Validation reject the operation before any mutation;
    /// I/O failures may leave a retryable in-memory session behind.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CoreError::NotFound(_) | CoreError::Validation(_))
    }
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rejection() {
        assert!(CoreError::NotFound("task".into()).is_rejection());
        assert!(CoreError::Validation("end before start".into()).is_rejection());

        let io = CoreError::Io(std::io::Error::other("disk full"));
        assert!(!io.is_rejection());
    }
}
