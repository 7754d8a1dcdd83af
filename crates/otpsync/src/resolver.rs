//! Candidate token resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use otpsync_model::TokenRecord;
use otpsync_storage::{StorageResult, TokenStore};

/// Resolves a sync request to the tokens it may re-anchor.
#[derive(Clone)]
pub struct TokenResolver {
    store: Arc<dyn TokenStore>,
}

impl TokenResolver {
    /// Creates a resolver over a token store.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Returns the eligible tokens of `owner`.
    ///
    /// With `token_id`, at most that one token. Ineligible tokens (disabled,
    /// outside their validity window, or owned by someone else) are left
    /// out. Nothing eligible is an empty vector.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the lookup fails.
    pub fn resolve(&self, owner: &str, token_id: Option<&str>) -> StorageResult<Vec<TokenRecord>> {
        self.resolve_at(owner, token_id, Utc::now())
    }

    /// Same as [`TokenResolver::resolve`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the lookup fails.
    pub fn resolve_at(
        &self,
        owner: &str,
        token_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<TokenRecord>> {
        let found = self.store.find(owner, token_id)?;
        let total = found.len();

        let eligible: Vec<TokenRecord> = found
            .into_iter()
            .filter(|token| token.owner == owner && token.is_eligible(now))
            .collect();

        tracing::debug!(
            owner,
            token_id = ?token_id,
            found = total,
            eligible = eligible.len(),
            "resolved sync candidates"
        );
        Ok(eligible)
    }
}

impl std::fmt::Debug for TokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResolver").finish_non_exhaustive()
    }
}
