//! Storage error types.

use thiserror::Error;

/// Errors that can occur during token storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Token not found.
    #[error("Token not found: {0}")]
    NotFound(String),

    /// The stored counter no longer matches the expected value.
    #[error("Counter conflict on token {token_id}: expected {expected}, found {actual}")]
    Conflict {
        /// Token identifier.
        token_id: String,
        /// Counter state the caller based its update on.
        expected: i64,
        /// Counter state currently stored.
        actual: i64,
    },

    /// The directory backend could not serve the request.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(token_id: impl Into<String>) -> Self {
        Self::NotFound(token_id.into())
    }

    /// Creates a counter conflict error.
    #[must_use]
    pub fn conflict(token_id: impl Into<String>, expected: i64, actual: i64) -> Self {
        Self::Conflict {
            token_id: token_id.into(),
            expected,
            actual,
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Checks if this is a concurrent update conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
