//! # otpsync-model
//!
//! Domain models for OTP token resynchronization.
//!
//! - [`TokenRecord`] - an OTP token owned by a directory user
//! - [`ProtocolControl`] - a request control attached to a bind or modify

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod control;
pub mod token;

pub use control::ProtocolControl;
pub use token::{TokenAlgorithm, TokenRecord, TokenSecret};
