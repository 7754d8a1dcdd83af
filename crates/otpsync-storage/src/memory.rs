//! In-memory token store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use otpsync_model::TokenRecord;
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::token::TokenStore;

/// Token store held in process memory.
///
/// Tokens are keyed and iterated by identifier, so `find` results are
/// ordered by token id. Commits take the write lock and compare the stored
/// counter before writing, which makes them linearizable per token.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<BTreeMap<String, TokenRecord>>,
    commits: AtomicUsize,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with tokens.
    #[must_use]
    pub fn with_tokens(tokens: impl IntoIterator<Item = TokenRecord>) -> Self {
        let store = Self::new();
        for token in tokens {
            store.insert(token);
        }
        store
    }

    /// Inserts or replaces a token.
    pub fn insert(&self, token: TokenRecord) {
        self.tokens.write().insert(token.id.clone(), token);
    }

    /// Removes a token, returning it if present.
    pub fn remove(&self, token_id: &str) -> Option<TokenRecord> {
        self.tokens.write().remove(token_id)
    }

    /// Number of stored tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Checks whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }

    /// Number of successful counter commits since creation.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn find(&self, owner: &str, token_id: Option<&str>) -> StorageResult<Vec<TokenRecord>> {
        let tokens = self.tokens.read();
        let found = match token_id {
            Some(id) => tokens
                .get(id)
                .filter(|token| token.owner == owner)
                .cloned()
                .into_iter()
                .collect(),
            None => tokens
                .values()
                .filter(|token| token.owner == owner)
                .cloned()
                .collect(),
        };
        Ok(found)
    }

    fn commit_counter(&self, token_id: &str, expected: i64, new: i64) -> StorageResult<()> {
        let mut tokens = self.tokens.write();
        let token = tokens
            .get_mut(token_id)
            .ok_or_else(|| StorageError::not_found(token_id))?;

        if token.counter_state != expected {
            return Err(StorageError::conflict(token_id, expected, token.counter_state));
        }

        token.counter_state = new;
        self.commits.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(token_id, new, "counter state committed");
        Ok(())
    }

    fn get(&self, token_id: &str) -> StorageResult<Option<TokenRecord>> {
        Ok(self.tokens.read().get(token_id).cloned())
    }
}
