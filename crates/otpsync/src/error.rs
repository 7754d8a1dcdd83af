//! Resynchronization error types.
//!
//! ## Security Note
//!
//! Error messages must not leak OTP codes, token secrets or which of the
//! two submitted codes was rejected.

use otpsync_storage::StorageError;
use thiserror::Error;

use crate::engine::SyncFailure;

/// The control value violates the sync request structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes do not form a valid sync request.
    #[error("malformed sync request at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset at which parsing stopped.
        offset: usize,
        /// What was wrong at that offset.
        reason: &'static str,
    },
}

impl DecodeError {
    /// Creates a malformed-input error.
    #[must_use]
    pub const fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::Malformed { offset, reason }
    }

    /// Byte offset at which parsing stopped.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::Malformed { offset, .. } => *offset,
        }
    }

    /// Description of the violation.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Malformed { reason, .. } => *reason,
        }
    }
}

/// Errors raised by the OTP validation primitive.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The token's algorithm is not supported by this validator.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The requested counter offset leaves the representable range.
    #[error("counter out of range")]
    CounterOutOfRange,

    /// The validation backend failed.
    #[error("validation backend error: {0}")]
    Backend(String),
}

/// Errors that fail a resynchronization request.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The control value could not be decoded.
    #[error("malformed synchronization control: {0}")]
    Decode(#[from] DecodeError),

    /// A sync control arrived on an operation without an identity.
    #[error("synchronization requested without an authenticated identity")]
    Unauthenticated,

    /// More than one sync control while policy allows only one.
    #[error("{0} synchronization controls on one operation")]
    MultipleControls(usize),

    /// The user owns no eligible token.
    #[error("no eligible token")]
    NoCandidates,

    /// No offset in the window made both codes valid in sequence.
    #[error("no sequential codes within the search window")]
    WindowExhausted,

    /// The store refused the counter update.
    #[error("token counter update rejected")]
    CommitRejected,

    /// Token lookup failed.
    #[error("token lookup failed: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Checks whether the request was structurally invalid rather than
    /// simply unsuccessful.
    #[must_use]
    pub const fn is_fail_closed(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Unauthenticated | Self::MultipleControls(_)
        )
    }

    /// Checks whether the client caused the failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::CommitRejected)
    }
}

impl From<SyncFailure> for SyncError {
    fn from(failure: SyncFailure) -> Self {
        match failure {
            SyncFailure::NoCandidates => Self::NoCandidates,
            SyncFailure::WindowExhausted => Self::WindowExhausted,
            SyncFailure::CommitRejected => Self::CommitRejected,
        }
    }
}

/// Result type for resynchronization.
pub type SyncResult<T> = Result<T, SyncError>;
