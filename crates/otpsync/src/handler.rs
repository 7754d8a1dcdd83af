//! Sync request pipeline for the host's pre-operation hook.
//!
//! The host calls [`SyncRequestHandler::handle`] before it authenticates a
//! bind (or applies a modify). A `false` return means the host must fail
//! the operation.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! Every resynchronization attempt emits one audit event on the
//! `otpsync::audit` target.

use std::sync::Arc;

use otpsync_core::{EventType, SyncConfig, SyncEvent};
use otpsync_model::ProtocolControl;
use otpsync_storage::TokenStore;

use crate::codec;
use crate::control;
use crate::engine::{Resynchronizer, SyncOutcome};
use crate::error::{SyncError, SyncResult};
use crate::resolver::TokenResolver;
use crate::validator::OtpValidator;

/// Read-only view of a host operation.
///
/// The pipeline only borrows the operation for the duration of one call.
pub trait Operation {
    /// Request controls attached to the operation, in request order.
    fn controls(&self) -> &[ProtocolControl];

    /// Identity the operation is authenticated as, if any.
    fn authenticated_identity(&self) -> Option<&str>;
}

/// Plain [`Operation`] for hosts that do not have their own type.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Request controls.
    pub controls: Vec<ProtocolControl>,
    /// Authenticated identity (the bind DN).
    pub identity: Option<String>,
}

impl OperationContext {
    /// Creates an unauthenticated context.
    #[must_use]
    pub fn new(controls: Vec<ProtocolControl>) -> Self {
        Self {
            controls,
            identity: None,
        }
    }

    /// Sets the authenticated identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Appends a control.
    #[must_use]
    pub fn with_control(mut self, control: ProtocolControl) -> Self {
        self.controls.push(control);
        self
    }
}

impl Operation for OperationContext {
    fn controls(&self) -> &[ProtocolControl] {
        &self.controls
    }

    fn authenticated_identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// Outcomes of one pipeline call, one per processed control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Successful outcomes in control order.
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    /// Checks whether the operation carried no sync request.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Runs detect, decode, resolve and resynchronize for an operation.
#[derive(Debug, Clone)]
pub struct SyncRequestHandler {
    config: SyncConfig,
    resolver: TokenResolver,
    engine: Resynchronizer,
}

impl SyncRequestHandler {
    /// Creates a handler.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn TokenStore>,
        validator: Arc<dyn OtpValidator>,
    ) -> otpsync_core::Result<Self> {
        config.validate()?;
        let engine = Resynchronizer::from_config(validator, store.clone(), &config);
        Ok(Self {
            config,
            resolver: TokenResolver::new(store),
            engine,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Checks whether the operation carries a sync request.
    #[must_use]
    pub fn is_requested(&self, op: &dyn Operation) -> bool {
        control::present(op.controls())
    }

    /// Processes every sync request control on `op`, in order.
    ///
    /// Stops at the first control that fails; controls after it are not
    /// looked at. Tokens re-anchored by earlier controls stay re-anchored.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MultipleControls`] when policy allows a single control
    /// - [`SyncError::Unauthenticated`] without an operation identity
    /// - [`SyncError::Decode`] for a malformed control value
    /// - [`SyncError::Storage`] when the token lookup fails
    /// - [`SyncError::NoCandidates`], [`SyncError::WindowExhausted`] or
    ///   [`SyncError::CommitRejected`] when the resynchronization fails
    pub fn process(&self, op: &dyn Operation) -> SyncResult<SyncReport> {
        let controls = op.controls();
        let requested = control::matching(controls).count();
        if requested == 0 {
            return Ok(SyncReport::default());
        }
        tracing::debug!(controls = requested, "sync request control present");

        if requested > 1 && self.config.reject_multiple_controls {
            let err = SyncError::MultipleControls(requested);
            reject(None, &err);
            return Err(err);
        }

        let Some(owner) = op.authenticated_identity() else {
            let err = SyncError::Unauthenticated;
            reject(None, &err);
            return Err(err);
        };

        let mut report = SyncReport::default();
        for (index, ctrl) in control::matching(controls).enumerate() {
            let outcome = self.process_control(owner, ctrl).map_err(|err| {
                tracing::debug!(control = index, error = %err, "sync control failed");
                err
            })?;
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    fn process_control(&self, owner: &str, ctrl: &ProtocolControl) -> SyncResult<SyncOutcome> {
        let value = ctrl.value_bytes();
        let request = match codec::decode_bounded(value, self.config.max_control_value_len) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    offset = e.offset(),
                    reason = e.reason(),
                    len = value.len(),
                    "malformed sync request control"
                );
                let err = SyncError::from(e);
                reject(Some(owner), &err);
                return Err(err);
            }
        };

        let candidates = self.resolver.resolve(owner, request.token_id()).map_err(|e| {
            let err = SyncError::from(e);
            SyncEvent::failure(EventType::TokenResyncError, err.to_string())
                .user(owner)
                .emit();
            err
        })?;
        let outcome = self
            .engine
            .resynchronize(&candidates, request.first_code, request.second_code);
        drop(candidates);

        match (outcome.failure, outcome.matched_token.as_deref()) {
            (None, Some(token_id)) => {
                let mut event = SyncEvent::success(EventType::TokenResync)
                    .user(owner)
                    .token(token_id);
                if let Some(offset) = outcome.applied_offset {
                    event = event.detail("offset", offset);
                }
                event.emit();
                Ok(outcome)
            }
            (failure, _) => {
                let err = failure.map_or(SyncError::WindowExhausted, SyncError::from);
                let mut event = SyncEvent::failure(EventType::TokenResyncError, err.to_string()).user(owner);
                if let Some(token_id) = request.token_id() {
                    event = event.token(token_id);
                }
                event.emit();
                Err(err)
            }
        }
    }

    /// Runs the pipeline and tells the host whether to proceed.
    ///
    /// `true` when no sync request is present or every request
    /// resynchronized; `false` otherwise.
    #[must_use]
    pub fn handle(&self, op: &dyn Operation) -> bool {
        match self.process(op) {
            Ok(_) => true,
            Err(e) if e.is_client_error() => {
                tracing::info!(error = %e, "OTP synchronization refused");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "OTP synchronization failed");
                false
            }
        }
    }
}

fn reject(owner: Option<&str>, err: &SyncError) {
    let mut event = SyncEvent::failure(EventType::SyncControlRejected, err.to_string());
    if let Some(owner) = owner {
        event = event.user(owner);
    }
    event.emit();
}
