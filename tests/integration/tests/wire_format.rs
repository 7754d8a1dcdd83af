//! Control values as they arrive from LDAP clients.

use ldap3::controls::RawControl;
use otpsync::{codec, SyncError, SyncRequest, OTP_SYNC_REQUEST_OID};
use otpsync_model::ProtocolControl;

use crate::common::{codes, hotp, TestEnv, ALICE};

/// BER INTEGER content octets for a non-negative value.
fn integer(value: u32) -> Vec<u8> {
    let mut content: Vec<u8> = value.to_be_bytes().to_vec();
    while content.len() > 1 && content[0] == 0 && content[1] & 0x80 == 0 {
        content.remove(0);
    }
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    let mut tlv = vec![0x02, u8::try_from(content.len()).unwrap()];
    tlv.extend(content);
    tlv
}

/// Hand-built sync request, as `ber_printf("{ii}")` would produce it.
fn sync_value(first: u32, second: u32, token_id: Option<&str>) -> Vec<u8> {
    let mut body = integer(first);
    body.extend(integer(second));
    if let Some(id) = token_id {
        body.push(0x04);
        body.push(u8::try_from(id.len()).unwrap());
        body.extend(id.as_bytes());
    }
    let mut value = vec![0x30, u8::try_from(body.len()).unwrap()];
    value.extend(body);
    value
}

#[test]
fn test_client_encoding_decodes() -> anyhow::Result<()> {
    let value = sync_value(123_456, 654_321, Some("ipatokenuniqueid=abc"));
    let request = codec::decode(&value)?;
    assert_eq!(request.first_code, 123_456);
    assert_eq!(request.second_code, 654_321);
    assert_eq!(request.token_id(), Some("ipatokenuniqueid=abc"));

    // Our own encoder produces the same bytes.
    assert_eq!(request.encode(), value);
    Ok(())
}

#[test]
fn test_long_form_length_is_accepted() -> anyhow::Result<()> {
    let short = sync_value(1, 2, None);
    let mut long = vec![0x30, 0x81, short[1]];
    long.extend(&short[2..]);

    assert_eq!(codec::decode(&long)?, SyncRequest::new(1, 2));
    Ok(())
}

#[test]
fn test_truncated_value_reports_offset() {
    let value = sync_value(1, 2, Some("token"));
    let err = codec::decode(&value[..value.len() - 2]).unwrap_err();
    assert!(err.offset() <= value.len());
    assert!(!err.reason().is_empty());
}

#[test]
fn test_ldap3_control_drives_pipeline() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 4);
    let raw = RawControl {
        ctype: OTP_SYNC_REQUEST_OID.to_string(),
        crit: true,
        val: Some(sync_value(first, second, Some("alice-1"))),
    };
    let op = otpsync::OperationContext::new(vec![ProtocolControl::from(raw)]).with_identity(ALICE);

    assert!(env.handler.handle(&op));
    assert_eq!(env.counter("alice-1")?, 5);
    Ok(())
}

#[test]
fn test_ldap3_control_without_value_fails() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let raw = RawControl {
        ctype: OTP_SYNC_REQUEST_OID.to_string(),
        crit: false,
        val: None,
    };
    let op = otpsync::OperationContext::new(vec![raw.into()]).with_identity(ALICE);

    assert!(matches!(env.handler.process(&op), Err(SyncError::Decode(_))));
    Ok(())
}
