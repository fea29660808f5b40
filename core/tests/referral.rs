//! Referral engine tests — one-time edge, both parties credited.

use rewards_core::{engine::LedgerEngine, LedgerError};

#[test]
fn referral_credits_both_parties() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(1).unwrap(); // referrer exists

    let receipt = engine.apply_referral(2, 1).unwrap();
    assert_eq!(receipt.reward, 10);
    assert_eq!(receipt.bonus, 5);

    let referrer = engine.account(1).unwrap();
    let referred = engine.account(2).unwrap();
    assert_eq!(referrer.balance, 10, "referrer gets the referral reward");
    assert_eq!(referrer.referrals, vec![2]);
    assert_eq!(referred.balance, 5, "referred account gets the bonus");
    assert!(referred.used_referral);
    assert_eq!(referred.referred_by, Some(1));
}

#[test]
fn self_referral_rejected_and_mutates_nothing() {
    let engine = LedgerEngine::build_test().unwrap();

    let err = engine.apply_referral(1, 1).unwrap_err();
    assert!(matches!(err, LedgerError::SelfReferral));

    let stats = engine.store.stats().unwrap();
    assert_eq!(stats.total_accounts, 0, "no account may be created");
    assert_eq!(stats.total_referrals, 0);
}

#[test]
fn second_use_always_fails_with_already_used() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(1).unwrap();
    engine.account(3).unwrap();
    engine.apply_referral(2, 1).unwrap();

    // Retry of the same edge.
    let err = engine.apply_referral(2, 1).unwrap_err();
    assert!(matches!(err, LedgerError::ReferralAlreadyUsed));

    // A different referrer is rejected the same way.
    let err = engine.apply_referral(2, 3).unwrap_err();
    assert!(matches!(err, LedgerError::ReferralAlreadyUsed));

    // Balances changed exactly once.
    assert_eq!(engine.account(1).unwrap().balance, 10);
    assert_eq!(engine.account(2).unwrap().balance, 5);
    assert_eq!(engine.account(3).unwrap().balance, 0);
}

#[test]
fn unknown_referrer_rejected_without_side_effects() {
    let engine = LedgerEngine::build_test().unwrap();

    let err = engine.apply_referral(2, 99).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownReferrer));

    // The aborted update must not even leave the caller's account behind.
    let stats = engine.store.stats().unwrap();
    assert_eq!(stats.total_accounts, 0);
}

#[test]
fn duplicate_edge_rejected() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(1).unwrap();
    engine.account(2).unwrap();

    // Manufacture a recorded edge whose referred side never used a
    // referral (unreachable through apply, which sets both together).
    engine
        .store
        .update(1, |account, _| {
            account.referrals.push(2);
            Ok(())
        })
        .unwrap();

    let err = engine.apply_referral(2, 1).unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateReferral));
    assert_eq!(engine.account(1).unwrap().balance, 0);
    assert_eq!(engine.account(2).unwrap().balance, 0);
}

#[test]
fn referral_recorded_in_event_log() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(1).unwrap();
    engine.apply_referral(2, 1).unwrap();

    let events = engine.store.events_after(0, 100).unwrap();
    let applied: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == "referral_applied")
        .collect();
    assert_eq!(applied.len(), 1);
    assert!(applied[0].payload.contains("\"referrer_id\":1"));
}
