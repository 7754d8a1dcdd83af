//! # otpsync
//!
//! Resynchronization of drifted OTP tokens through the OTP sync request
//! control (`2.16.840.1.113730.3.8.10.6`).
//!
//! A client whose token drifted sends two consecutive codes in a request
//! control on a bind or modify. The pipeline:
//!
//! 1. detects the control ([`control::present`]),
//! 2. decodes its BER value ([`codec::decode`]),
//! 3. resolves the user's eligible tokens ([`TokenResolver`]),
//! 4. searches a bounded counter window for the two codes in sequence and
//!    re-anchors the matching token ([`Resynchronizer`]).
//!
//! [`SyncRequestHandler`] ties the steps together for the host.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and Authentication
//! - IA-5: Authenticator Management
//! - SI-10: Information Input Validation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use otpsync::{OperationContext, SyncRequestHandler};
//!
//! let handler = SyncRequestHandler::new(config, store, validator)?;
//! let op = OperationContext::new(controls).with_identity(user_dn);
//! if !handler.handle(&op) {
//!     // fail the bind
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod control;
pub mod engine;
pub mod error;
pub mod handler;
pub mod resolver;
pub mod validator;

pub use codec::SyncRequest;
pub use control::OTP_SYNC_REQUEST_OID;
pub use engine::{Resynchronizer, SyncFailure, SyncOutcome};
pub use error::{DecodeError, SyncError, SyncResult, ValidationError};
pub use handler::{Operation, OperationContext, SyncReport, SyncRequestHandler};
pub use resolver::TokenResolver;
pub use validator::OtpValidator;
