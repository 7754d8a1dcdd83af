//! # otpsync-core
//!
//! Core configuration, error handling and telemetry for OTP token
//! resynchronization.
//!
//! This crate provides the foundational types shared by the model,
//! storage and pipeline crates.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AU-2: Event logging framework
//! - IA-5: Authenticator management (resynchronization window policy)
//! - SI-11: Error handling

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod telemetry;

pub use config::{SyncConfig, DEFAULT_MAX_STEPS, MAX_STEPS_CEILING};
pub use error::{Error, Result};
pub use event::{EventOutcome, EventType, SyncEvent};
