//! Audit events for token resynchronization.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! Every resynchronization attempt produces exactly one event.
//!
//! ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
//!
//! All events include:
//! - Timestamp (ISO 8601)
//! - Event type
//! - User identity (when available)
//! - Outcome (success/failure)
//! - Affected token (when known)
//!
//! OTP codes are never part of an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A token counter was re-anchored.
    TokenResync,
    /// Resynchronization was attempted and failed.
    TokenResyncError,
    /// The synchronization control could not be decoded.
    SyncControlRejected,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Authenticated identity that submitted the request.
    pub user: Option<String>,

    /// Token whose counter was touched.
    pub token_id: Option<String>,

    /// Error message (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl SyncEvent {
    /// Creates a success event.
    #[must_use]
    pub fn success(event_type: EventType) -> Self {
        Self::new(event_type, EventOutcome::Success)
    }

    /// Creates a failure event.
    #[must_use]
    pub fn failure(event_type: EventType, error: impl Into<String>) -> Self {
        let mut event = Self::new(event_type, EventOutcome::Failure);
        event.error = Some(error.into());
        event
    }

    fn new(event_type: EventType, outcome: EventOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            outcome,
            user: None,
            token_id: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the user identity.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the token identifier.
    #[must_use]
    pub fn token(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Adds a detail.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.push((key.into(), value.to_string()));
        self
    }

    /// Returns whether this event records a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == EventOutcome::Success
    }

    /// Writes the event to the `otpsync::audit` tracing target.
    pub fn emit(&self) {
        let user = self.user.as_deref().unwrap_or("-");
        let token = self.token_id.as_deref().unwrap_or("-");
        match self.outcome {
            EventOutcome::Success => tracing::info!(
                target: "otpsync::audit",
                event_type = ?self.event_type,
                user,
                token,
                details = ?self.details,
                "resynchronization event"
            ),
            EventOutcome::Failure => tracing::warn!(
                target: "otpsync::audit",
                event_type = ?self.event_type,
                user,
                token,
                error = self.error.as_deref().unwrap_or("-"),
                details = ?self.details,
                "resynchronization event"
            ),
        }
    }
}
