//! OTP validation primitive contract.
//!
//! The hashing itself (HOTP/TOTP, key handling, digit count) lives outside
//! this crate. The engine only asks whether a code is valid at a given
//! offset from the token's stored counter state.

use std::sync::Arc;

use otpsync_model::TokenRecord;

use crate::error::ValidationError;

/// Checks OTP codes against a token.
///
/// Implementations must be thread-safe; one validator serves every
/// concurrent request.
pub trait OtpValidator: Send + Sync {
    /// Checks whether `code` is the token's code at `offset` steps past its
    /// stored counter state.
    ///
    /// For counter-based tokens the checked counter is
    /// `counter_state + offset`. For time-based tokens it is the current
    /// time step plus the stored drift plus `offset`.
    ///
    /// ## Errors
    ///
    /// An error means the code could not be checked at this offset. The
    /// engine treats it as "not valid" and keeps searching.
    fn is_valid_at(
        &self,
        token: &TokenRecord,
        offset: i64,
        code: u32,
    ) -> Result<bool, ValidationError>;
}

impl<V: OtpValidator + ?Sized> OtpValidator for Arc<V> {
    fn is_valid_at(
        &self,
        token: &TokenRecord,
        offset: i64,
        code: u32,
    ) -> Result<bool, ValidationError> {
        (**self).is_valid_at(token, offset, code)
    }
}
