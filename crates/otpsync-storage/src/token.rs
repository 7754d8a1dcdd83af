//! Token storage provider trait.

use otpsync_model::TokenRecord;

use crate::error::StorageResult;

/// Provider for OTP token storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
///
/// ## Concurrency
///
/// [`TokenStore::commit_counter`] must be atomic and linearizable per
/// token: two concurrent commits based on the same `expected` value must
/// not both succeed.
///
/// ## Security Note
///
/// Token secrets must be encrypted at rest and never logged.
pub trait TokenStore: Send + Sync {
    /// Finds tokens owned by `owner`.
    ///
    /// With `token_id`, returns at most the single token with that
    /// identifier, and only if `owner` owns it. Without, returns every
    /// token owned by `owner`. Order must be deterministic.
    ///
    /// No match is an empty vector, not an error.
    fn find(&self, owner: &str, token_id: Option<&str>) -> StorageResult<Vec<TokenRecord>>;

    /// Sets the counter state of `token_id` to `new` if it still equals
    /// `expected`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the token doesn't exist and
    /// `StorageError::Conflict` if the stored counter moved.
    fn commit_counter(&self, token_id: &str, expected: i64, new: i64) -> StorageResult<()>;

    /// Gets a token by identifier regardless of owner.
    fn get(&self, token_id: &str) -> StorageResult<Option<TokenRecord>>;
}
