//! Pipeline scenarios: detect, decode, resolve, resynchronize, commit.

use chrono::{Duration, Utc};
use otpsync::{SyncError, SyncRequest};
use otpsync_core::SyncConfig;
use otpsync_model::{ProtocolControl, TokenRecord, TokenSecret};

use crate::common::{codes, hotp, key_for, sync_control, TestEnv, ALICE, BOB};

/// A drifted token is re-anchored past the second code.
#[test]
fn test_drifted_token_is_resynchronized() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 100)])?;
    let (first, second) = codes("alice-1", 103);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);

    let report = env.handler.process(&op)?;

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.matched_token.as_deref(), Some("alice-1"));
    assert_eq!(outcome.applied_offset, Some(3));
    assert_eq!(outcome.committed_state, Some(104));
    assert_eq!(env.counter("alice-1")?, 104);
    Ok(())
}

/// Operations without the control never touch the store or validator.
#[test]
fn test_plain_bind_is_untouched() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let op = otpsync::OperationContext::new(vec![]).with_identity(ALICE);

    assert!(env.handler.handle(&op));
    assert_eq!(env.validator.calls(), 0);
    assert_eq!(env.store.commit_count(), 0);
    Ok(())
}

/// The named token is the only candidate.
#[test]
fn test_named_token_only() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0), hotp("alice-2", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 2);
    let request = SyncRequest::new(first, second).with_token("alice-2");
    let op = otpsync::OperationContext::new(vec![sync_control(&request)]).with_identity(ALICE);

    assert!(matches!(env.handler.process(&op), Err(SyncError::WindowExhausted)));
    assert_eq!(env.counter("alice-1")?, 0);
    assert_eq!(env.validator.calls(), 25);
    Ok(())
}

/// Without a token id every eligible token of the user is searched.
#[test]
fn test_all_owned_tokens_are_searched() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0), hotp("alice-2", ALICE, 40)])?;
    let (first, second) = codes("alice-2", 50);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);

    assert!(env.handler.handle(&op));
    assert_eq!(env.counter("alice-1")?, 0);
    assert_eq!(env.counter("alice-2")?, 51);
    Ok(())
}

/// Someone else's token cannot be re-anchored, even by id.
#[test]
fn test_foreign_token_is_invisible() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("bob-1", BOB, 10)])?;
    let (first, second) = codes("bob-1", 11);
    let request = SyncRequest::new(first, second).with_token("bob-1");
    let op = otpsync::OperationContext::new(vec![sync_control(&request)]).with_identity(ALICE);

    assert!(matches!(env.handler.process(&op), Err(SyncError::NoCandidates)));
    assert_eq!(env.counter("bob-1")?, 10);
    assert_eq!(env.validator.calls(), 0);
    Ok(())
}

/// Disabled and expired tokens are not candidates.
#[test]
fn test_ineligible_tokens_are_skipped() -> anyhow::Result<()> {
    let now = Utc::now();
    let env = TestEnv::new(vec![
        hotp("alice-disabled", ALICE, 0).disabled(),
        hotp("alice-expired", ALICE, 0).with_validity(None, Some(now - Duration::days(1))),
        hotp("alice-future", ALICE, 0).with_validity(Some(now + Duration::days(1)), None),
    ])?;

    for id in ["alice-disabled", "alice-expired", "alice-future"] {
        let (first, second) = codes(id, 1);
        let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
            .with_identity(ALICE);
        assert!(matches!(env.handler.process(&op), Err(SyncError::NoCandidates)));
        assert_eq!(env.counter(id)?, 0);
    }
    Ok(())
}

/// Drift beyond the configured window is not recoverable.
#[test]
fn test_window_is_bounded_by_config() -> anyhow::Result<()> {
    let env = TestEnv::with_config(SyncConfig::new().max_steps(10), vec![hotp("alice-1", ALICE, 0)])?;

    let (first, second) = codes("alice-1", 10);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);
    assert!(!env.handler.handle(&op));
    assert_eq!(env.validator.calls(), 10);

    let (first, second) = codes("alice-1", 8);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);
    assert!(env.handler.handle(&op));
    assert_eq!(env.counter("alice-1")?, 9);
    Ok(())
}

/// A first code that matches without its successor cannot buy extra calls.
#[test]
fn test_unconfirmed_first_code_stays_within_budget() -> anyhow::Result<()> {
    let env = TestEnv::with_config(
        SyncConfig::new().max_steps(10),
        vec![hotp("alice-1", ALICE, 0), hotp("alice-2", ALICE, 0)],
    )?;

    for at in [0, 5, 9] {
        let (first, _) = codes("alice-1", at);
        let (_, wrong) = codes("alice-1", at + 5);
        let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, wrong))])
            .with_identity(ALICE);
        let before = env.validator.calls();

        assert!(matches!(env.handler.process(&op), Err(SyncError::WindowExhausted)));
        assert!(env.validator.calls() - before <= 10 * 2);
    }
    assert_eq!(env.store.commit_count(), 0);
    Ok(())
}

/// A replayed request finds nothing: the counter already moved past it.
#[test]
fn test_replay_after_success_fails() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 5);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);

    assert!(env.handler.handle(&op));
    assert_eq!(env.counter("alice-1")?, 6);

    assert!(!env.handler.handle(&op));
    assert_eq!(env.counter("alice-1")?, 6);
    assert_eq!(env.store.commit_count(), 1);
    Ok(())
}

/// Codes in the wrong order do not match.
#[test]
fn test_swapped_codes_fail() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 5);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(second, first))])
        .with_identity(ALICE);

    assert!(matches!(env.handler.process(&op), Err(SyncError::WindowExhausted)));
    assert_eq!(env.counter("alice-1")?, 0);
    Ok(())
}

/// Validator errors count as mismatches, and the search goes on.
#[test]
fn test_unsupported_token_is_skipped() -> anyhow::Result<()> {
    let totp = TokenRecord::new_totp("alice-totp", ALICE, 30, TokenSecret::new(key_for("alice-totp")));
    let env = TestEnv::new(vec![totp, hotp("alice-hotp", ALICE, 0)])?;
    let (first, second) = codes("alice-hotp", 3);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))])
        .with_identity(ALICE);

    assert!(env.handler.handle(&op));
    assert_eq!(env.counter("alice-hotp")?, 4);
    assert_eq!(env.counter("alice-totp")?, 0);
    Ok(())
}

/// The control on an anonymous bind fails the operation.
#[test]
fn test_anonymous_bind_fails() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 1);
    let op = otpsync::OperationContext::new(vec![sync_control(&SyncRequest::new(first, second))]);

    assert!(matches!(env.handler.process(&op), Err(SyncError::Unauthenticated)));
    assert_eq!(env.validator.calls(), 0);
    Ok(())
}

/// A malformed first control stops the call before the second is read.
#[test]
fn test_malformed_control_stops_processing() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0)])?;
    let (first, second) = codes("alice-1", 1);
    let op = otpsync::OperationContext::new(vec![])
        .with_control(ProtocolControl::new(otpsync::OTP_SYNC_REQUEST_OID, vec![0x30, 0x80, 0x00, 0x00]))
        .with_control(sync_control(&SyncRequest::new(first, second)))
        .with_identity(ALICE);

    let err = env.handler.process(&op).unwrap_err();
    assert!(err.is_fail_closed());
    assert_eq!(env.validator.calls(), 0);
    assert_eq!(env.counter("alice-1")?, 0);
    Ok(())
}

/// Two valid controls for two tokens are both applied, in order.
#[test]
fn test_multiple_controls_applied_in_order() -> anyhow::Result<()> {
    let env = TestEnv::new(vec![hotp("alice-1", ALICE, 0), hotp("alice-2", ALICE, 0)])?;
    let (a1, a2) = codes("alice-1", 2);
    let (b1, b2) = codes("alice-2", 7);
    let op = otpsync::OperationContext::new(vec![])
        .with_control(sync_control(&SyncRequest::new(a1, a2).with_token("alice-1")))
        .with_control(sync_control(&SyncRequest::new(b1, b2).with_token("alice-2")))
        .with_identity(ALICE);

    let report = env.handler.process(&op)?;
    let matched: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| o.matched_token.as_deref())
        .collect();
    assert_eq!(matched, ["alice-1", "alice-2"]);
    assert_eq!(env.counter("alice-1")?, 3);
    assert_eq!(env.counter("alice-2")?, 8);
    Ok(())
}

/// Policy can refuse operations carrying several sync controls.
#[test]
fn test_multiple_controls_refused_by_policy() -> anyhow::Result<()> {
    let env = TestEnv::with_config(
        SyncConfig::new().reject_multiple_controls(true),
        vec![hotp("alice-1", ALICE, 0)],
    )?;
    let (first, second) = codes("alice-1", 1);
    let control = sync_control(&SyncRequest::new(first, second));
    let op = otpsync::OperationContext::new(vec![control.clone(), control]).with_identity(ALICE);

    assert!(matches!(env.handler.process(&op), Err(SyncError::MultipleControls(2))));
    assert_eq!(env.counter("alice-1")?, 0);
    Ok(())
}
