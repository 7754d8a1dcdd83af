//! # otpsync-storage
//!
//! Storage abstraction for OTP token records.
//!
//! The resynchronization pipeline reads candidate tokens through
//! [`TokenStore::find`] and writes the re-anchored counter through
//! [`TokenStore::commit_counter`]. Concrete directory backends implement
//! the trait; [`MemoryTokenStore`] backs tests and embedded use.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod token;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryTokenStore;
pub use token::TokenStore;
