//! Withdrawal workflow tests — request, approve, conservation.

use rewards_core::{engine::LedgerEngine, LedgerError};

/// Test owner id from `LedgerConfig::test_defaults`.
const OWNER: i64 = 42;

fn seed_balance(engine: &LedgerEngine, id: i64, coins: i64) {
    engine
        .store
        .update(id, |account, _| {
            account.balance = coins;
            Ok(())
        })
        .unwrap();
}

#[test]
fn request_converts_whole_rupees_and_keeps_remainder() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();

    let receipt = engine.request_withdrawal(7).unwrap();
    assert_eq!(receipt.rupees, 10);
    assert_eq!(receipt.remainder, 5);
    assert_eq!(receipt.payout_id, "alice@upi");

    let account = engine.account(7).unwrap();
    assert_eq!(account.balance, 5);
    assert_eq!(account.pending_withdrawal, Some(10));

    // Conservation: every coin is either still on the balance or inside
    // the pending request.
    assert_eq!(account.balance + 10 * 10, 105);
}

#[test]
fn request_below_minimum_rejected() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 99);
    engine.set_payout_id(7, "alice@upi").unwrap();

    let err = engine.request_withdrawal(7).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance { minimum: 100 }
    ));
    assert_eq!(engine.account(7).unwrap().balance, 99, "nothing deducted");
}

#[test]
fn request_without_payout_destination_rejected() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 150);

    let err = engine.request_withdrawal(7).unwrap_err();
    assert!(matches!(err, LedgerError::PayoutDestinationNotSet));
    assert_eq!(engine.account(7).unwrap().balance, 150);
}

#[test]
fn second_request_rejected_while_pending() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();

    engine.request_withdrawal(7).unwrap();
    // Top the balance back up so only the pending marker can reject.
    seed_balance(&engine, 7, 200);

    let err = engine.request_withdrawal(7).unwrap_err();
    assert!(matches!(err, LedgerError::WithdrawalAlreadyPending));

    let account = engine.account(7).unwrap();
    assert_eq!(account.pending_withdrawal, Some(10), "first request stands");
    assert_eq!(account.balance, 200, "second request deducted nothing");
}

#[test]
fn approval_completes_the_request() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();
    engine.request_withdrawal(7).unwrap();

    let receipt = engine.approve_withdrawal(OWNER, 7).unwrap();
    assert_eq!(receipt.amount, 10);

    let account = engine.account(7).unwrap();
    assert_eq!(account.withdrawal_history, vec![10]);
    assert_eq!(account.pending_withdrawal, None);
}

#[test]
fn approval_requires_the_owner_identity() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();
    engine.request_withdrawal(7).unwrap();

    let err = engine.approve_withdrawal(7, 7).unwrap_err();
    assert!(matches!(err, LedgerError::NotAuthorized));
    assert_eq!(engine.account(7).unwrap().pending_withdrawal, Some(10));
}

#[test]
fn approval_without_pending_request_rejected() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(7).unwrap();

    let err = engine.approve_withdrawal(OWNER, 7).unwrap_err();
    assert!(matches!(err, LedgerError::NoPendingWithdrawal));
}

#[test]
fn account_can_withdraw_again_after_approval() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();

    engine.request_withdrawal(7).unwrap();
    engine.approve_withdrawal(OWNER, 7).unwrap();

    seed_balance(&engine, 7, 125);
    let receipt = engine.request_withdrawal(7).unwrap();
    assert_eq!(receipt.rupees, 12);

    engine.approve_withdrawal(OWNER, 7).unwrap();
    assert_eq!(engine.account(7).unwrap().withdrawal_history, vec![10, 12]);
}

#[test]
fn payout_destination_requires_an_at_sign() {
    let engine = LedgerEngine::build_test().unwrap();

    let err = engine.set_payout_id(7, "aliceupi").unwrap_err();
    assert!(matches!(err, LedgerError::InvalidPayoutId));

    // Overwrite is allowed any time.
    engine.set_payout_id(7, "  alice@upi  ").unwrap();
    engine.set_payout_id(7, "bob@upi").unwrap();
    assert_eq!(
        engine.account(7).unwrap().payout_id.as_deref(),
        Some("bob@upi")
    );
}

#[test]
fn withdrawal_events_emitted_in_order() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);
    engine.set_payout_id(7, "alice@upi").unwrap();
    engine.request_withdrawal(7).unwrap();
    engine.approve_withdrawal(OWNER, 7).unwrap();

    let events = engine.store.events_after(0, 100).unwrap();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| e.event_type.as_str())
        .filter(|t| t.starts_with("withdrawal_"))
        .collect();
    assert_eq!(kinds, vec!["withdrawal_requested", "withdrawal_completed"]);
}
