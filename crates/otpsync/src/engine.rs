//! Bounded-window resynchronization search.
//!
//! ## NIST 800-53 Rev5: IA-5 (Authenticator Management)
//!
//! The window caps the number of validation attempts per request: at most
//! `max_steps` validator calls per candidate token, second-code checks
//! included. It comes from configuration, never from the request, so a
//! client cannot widen it to brute-force codes.

use std::fmt;
use std::sync::Arc;

use otpsync_core::{SyncConfig, MAX_STEPS_CEILING};
use otpsync_model::TokenRecord;
use otpsync_storage::TokenStore;

use crate::validator::OtpValidator;

/// Why a resynchronization did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    /// There was no candidate token to search.
    NoCandidates,
    /// No offset in the window made both codes valid in sequence.
    WindowExhausted,
    /// A match was found but the store refused the counter update.
    CommitRejected,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidates"),
            Self::WindowExhausted => write!(f, "window exhausted"),
            Self::CommitRejected => write!(f, "commit rejected"),
        }
    }
}

/// Result of one resynchronization attempt.
///
/// Never persisted; the caller inspects it and drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Token whose counter was re-anchored.
    pub matched_token: Option<String>,
    /// Offset at which the first code matched.
    pub applied_offset: Option<u32>,
    /// Counter state written to the store.
    pub committed_state: Option<i64>,
    /// Set when the attempt failed.
    pub failure: Option<SyncFailure>,
}

impl SyncOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn synchronized(token_id: impl Into<String>, offset: u32, state: i64) -> Self {
        Self {
            matched_token: Some(token_id.into()),
            applied_offset: Some(offset),
            committed_state: Some(state),
            failure: None,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub const fn failed(failure: SyncFailure) -> Self {
        Self {
            matched_token: None,
            applied_offset: None,
            committed_state: None,
            failure: Some(failure),
        }
    }

    /// Checks whether a token was re-anchored.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Searches candidate tokens for two sequential codes and commits the
/// new counter state of the first match.
#[derive(Clone)]
pub struct Resynchronizer {
    validator: Arc<dyn OtpValidator>,
    store: Arc<dyn TokenStore>,
    max_steps: u32,
}

impl Resynchronizer {
    /// Creates an engine with an explicit window.
    ///
    /// `max_steps` is clamped to [`MAX_STEPS_CEILING`].
    #[must_use]
    pub fn new(validator: Arc<dyn OtpValidator>, store: Arc<dyn TokenStore>, max_steps: u32) -> Self {
        Self {
            validator,
            store,
            max_steps: max_steps.min(MAX_STEPS_CEILING),
        }
    }

    /// Creates an engine with the configured window.
    #[must_use]
    pub fn from_config(
        validator: Arc<dyn OtpValidator>,
        store: Arc<dyn TokenStore>,
        config: &SyncConfig,
    ) -> Self {
        Self::new(validator, store, config.max_steps)
    }

    /// Offsets searched per token.
    #[must_use]
    pub const fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Re-anchors the first candidate for which `first` and `second` are
    /// valid at consecutive offsets `k` and `k + 1`.
    ///
    /// Candidates are searched in order, each over offsets
    /// `0..token.search_window(max_steps)` and with that many validator
    /// calls at most. The first satisfying pair wins.
    /// On success the token's counter state moves from `base` to
    /// `base + k + 1` through one conditional store update; otherwise no
    /// token is touched.
    pub fn resynchronize(&self, candidates: &[TokenRecord], first: u32, second: u32) -> SyncOutcome {
        if candidates.is_empty() {
            return SyncOutcome::failed(SyncFailure::NoCandidates);
        }

        match self.search(candidates, first, second) {
            Some((token, offset)) => self.commit(token, offset),
            None => {
                tracing::warn!(
                    candidates = candidates.len(),
                    max_steps = self.max_steps,
                    "no sequential codes within the search window"
                );
                SyncOutcome::failed(SyncFailure::WindowExhausted)
            }
        }
    }

    fn search<'t>(
        &self,
        candidates: &'t [TokenRecord],
        first: u32,
        second: u32,
    ) -> Option<(&'t TokenRecord, u32)> {
        candidates
            .iter()
            .find_map(|token| self.search_token(token, first, second).map(|k| (token, k)))
    }

    /// Returns the first offset of `token` at which the codes are sequential.
    ///
    /// The window doubles as the validator call budget, so a first code
    /// matching late in the window may leave no call for the second one.
    fn search_token(&self, token: &TokenRecord, first: u32, second: u32) -> Option<u32> {
        let window = token.search_window(self.max_steps);
        let mut calls = 0;

        for k in 0..window {
            if calls == window {
                break;
            }
            calls += 1;
            if !self.check(token, i64::from(k), first) {
                continue;
            }

            if calls == window {
                tracing::debug!(token_id = %token.id, offset = k, "call budget spent before second code");
                break;
            }
            calls += 1;
            if self.check(token, i64::from(k) + 1, second) {
                return Some(k);
            }
        }
        None
    }

    fn check(&self, token: &TokenRecord, offset: i64, code: u32) -> bool {
        match self.validator.is_valid_at(token, offset, code) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::debug!(token_id = %token.id, offset, error = %e, "validation attempt failed");
                false
            }
        }
    }

    fn commit(&self, token: &TokenRecord, offset: u32) -> SyncOutcome {
        let base = token.counter_state;
        let Some(next) = base.checked_add(i64::from(offset) + 1) else {
            tracing::warn!(token_id = %token.id, "counter state overflow");
            return SyncOutcome::failed(SyncFailure::CommitRejected);
        };

        match self.store.commit_counter(&token.id, base, next) {
            Ok(()) => {
                tracing::info!(
                    token_id = %token.id,
                    offset,
                    counter_state = next,
                    "token resynchronized"
                );
                SyncOutcome::synchronized(token.id.clone(), offset, next)
            }
            Err(e) => {
                tracing::warn!(token_id = %token.id, error = %e, "counter commit rejected");
                SyncOutcome::failed(SyncFailure::CommitRejected)
            }
        }
    }
}

impl fmt::Debug for Resynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resynchronizer")
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
