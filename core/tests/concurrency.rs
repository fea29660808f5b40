//! Concurrency tests — one engine, many caller threads, exactly-once
//! semantics for the guarded transitions.

use rewards_core::{engine::LedgerEngine, LedgerError};
use std::sync::Arc;
use std::thread;

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
fn concurrent_referrals_of_the_same_pair_apply_once() {
    let _ = env_logger::builder().is_test(true).try_init();
    let engine = Arc::new(LedgerEngine::build_test().unwrap());
    engine.account(1).unwrap();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.apply_referral(2, 1).map(|_| ()))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of 50 callers may win");

    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    LedgerError::ReferralAlreadyUsed | LedgerError::DuplicateReferral
                ),
                "losers must fail the referral guards, got: {err}"
            );
        }
    }

    // Credited exactly once on each side.
    assert_eq!(engine.account(1).unwrap().balance, 10);
    assert_eq!(engine.account(1).unwrap().referrals, vec![2]);
    assert_eq!(engine.account(2).unwrap().balance, 5);
}

#[test]
fn concurrent_same_day_claims_grant_one_bonus() {
    let engine = Arc::new(LedgerEngine::build_test().unwrap());

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.claim_daily_bonus(5).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(engine.account(5).unwrap().balance, 5);
}

#[test]
fn concurrent_withdrawal_requests_deduct_once() {
    let engine = Arc::new(LedgerEngine::build_test().unwrap());
    seed_balance(&engine, 9, 255);
    engine.set_payout_id(9, "nine@upi").unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.request_withdrawal(9).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    let account = engine.account(9).unwrap();
    assert_eq!(account.pending_withdrawal, Some(25));
    assert_eq!(account.balance, 5);
    // Conservation across the race: 255 coins in, 25 rupees out.
    assert_eq!(account.balance + 25 * 10, 255);
}
