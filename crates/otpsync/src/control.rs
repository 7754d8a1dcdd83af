//! Sync request control detection.

use otpsync_model::ProtocolControl;

/// OID of the OTP sync request control.
pub const OTP_SYNC_REQUEST_OID: &str = "2.16.840.1.113730.3.8.10.6";

/// Checks whether any control is a sync request.
///
/// An empty control list is the normal "not requested" case.
#[must_use]
pub fn present(controls: &[ProtocolControl]) -> bool {
    controls.iter().any(is_sync_request)
}

/// Iterates over the sync request controls in request order.
pub fn matching(controls: &[ProtocolControl]) -> impl Iterator<Item = &ProtocolControl> {
    controls.iter().filter(|control| is_sync_request(control))
}

fn is_sync_request(control: &ProtocolControl) -> bool {
    control.is(OTP_SYNC_REQUEST_OID)
}
