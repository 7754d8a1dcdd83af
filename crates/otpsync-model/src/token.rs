//! OTP token domain model.
//!
//! Tokens are authentication factors owned by a single directory user.
//! Enrollment and revocation happen elsewhere; this crate only describes
//! the record the resynchronization pipeline borrows.
//!
//! ## Security Note
//!
//! The token secret is wrapped in [`TokenSecret`] so it is redacted from
//! `Debug` output and zeroized on drop. Only the OTP validation primitive
//! should call [`TokenSecret::expose`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};

/// OTP algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenAlgorithm {
    /// Counter-based (RFC 4226). The counter state is the next expected
    /// counter value.
    Hotp,
    /// Time-based (RFC 6238). The counter state is the accumulated clock
    /// drift, measured in time steps.
    Totp {
        /// Length of one time step in seconds.
        time_step: u32,
    },
}

impl TokenAlgorithm {
    /// Returns the algorithm name for display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hotp => "hotp",
            Self::Totp { .. } => "totp",
        }
    }

    /// Checks if this is a counter-based token.
    #[must_use]
    pub const fn is_counter_based(&self) -> bool {
        matches!(self, Self::Hotp)
    }
}

/// Token key material.
#[derive(Clone)]
pub struct TokenSecret(Arc<SecretBox<[u8]>>);

impl TokenSecret {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let boxed: Box<[u8]> = bytes.into_boxed_slice();
        Self(Arc::new(SecretBox::new(boxed)))
    }

    /// Exposes the key bytes to the validation primitive.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Checks whether the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret([REDACTED])")
    }
}

/// An OTP token record.
///
/// `counter_state` is the only field the resynchronization pipeline may
/// change, and only through the token store's conditional commit.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    // === Identity ===
    /// Unique token identifier (the token entry DN in a directory).
    pub id: String,
    /// Identity of the user owning this token.
    pub owner: String,

    // === Algorithm ===
    /// Algorithm family.
    pub algorithm: TokenAlgorithm,
    /// Counter (HOTP) or drift in time steps (TOTP).
    pub counter_state: i64,
    /// Key material.
    pub secret: TokenSecret,
    /// Per-token limit on the resynchronization window.
    ///
    /// Can only narrow the configured policy window.
    pub max_search_steps: Option<u32>,

    // === Eligibility ===
    /// Administratively disabled.
    pub disabled: bool,
    /// Token is not valid before this instant.
    pub not_before: Option<DateTime<Utc>>,
    /// Token is not valid after this instant.
    pub not_after: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Creates an enabled token without a validity window.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        algorithm: TokenAlgorithm,
        secret: TokenSecret,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            algorithm,
            counter_state: 0,
            secret,
            max_search_steps: None,
            disabled: false,
            not_before: None,
            not_after: None,
        }
    }

    /// Creates a counter-based token.
    #[must_use]
    pub fn new_hotp(id: impl Into<String>, owner: impl Into<String>, secret: TokenSecret) -> Self {
        Self::new(id, owner, TokenAlgorithm::Hotp, secret)
    }

    /// Creates a time-based token.
    #[must_use]
    pub fn new_totp(
        id: impl Into<String>,
        owner: impl Into<String>,
        time_step: u32,
        secret: TokenSecret,
    ) -> Self {
        Self::new(id, owner, TokenAlgorithm::Totp { time_step }, secret)
    }

    /// Sets the counter state.
    #[must_use]
    pub const fn with_counter_state(mut self, state: i64) -> Self {
        self.counter_state = state;
        self
    }

    /// Sets the per-token search limit.
    #[must_use]
    pub const fn with_max_search_steps(mut self, steps: u32) -> Self {
        self.max_search_steps = Some(steps);
        self
    }

    /// Sets the validity window.
    #[must_use]
    pub const fn with_validity(
        mut self,
        not_before: Option<DateTime<Utc>>,
        not_after: Option<DateTime<Utc>>,
    ) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// Marks the token as disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Checks whether `now` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |nb| now >= nb) && self.not_after.map_or(true, |na| now <= na)
    }

    /// Checks whether the token may take part in authentication at `now`.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && self.is_valid_at(now)
    }

    /// Search window for this token under the given policy window.
    #[must_use]
    pub fn search_window(&self, policy_steps: u32) -> u32 {
        self.max_search_steps
            .map_or(policy_steps, |steps| steps.min(policy_steps))
    }
}
