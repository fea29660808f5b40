//! Query/aggregation tests — balance breakdown, leaderboard, stats,
//! pending list. All reads come from one consistent snapshot.

use rewards_core::engine::LedgerEngine;

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
fn balance_breaks_down_into_rupees_and_remainder() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 7, 105);

    let view = engine.balance_of(7).unwrap();
    assert_eq!(view.coins, 105);
    assert_eq!(view.rupees, 10);
    assert_eq!(view.remainder, 5);
}

#[test]
fn balance_of_unknown_account_is_zero() {
    let engine = LedgerEngine::build_test().unwrap();

    let view = engine.balance_of(404).unwrap();
    assert_eq!(view.coins, 0);
    assert_eq!(view.rupees, 0);
}

#[test]
fn leaderboard_sorts_descending_with_first_seen_winning_ties() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 1, 50);
    seed_balance(&engine, 2, 100);
    seed_balance(&engine, 3, 50);

    let top = engine.leaderboard(10).unwrap();
    let ids: Vec<i64> = top.iter().map(|e| e.user_id).collect();
    assert_eq!(ids, vec![2, 1, 3], "ties rank the first-seen account higher");
    assert_eq!(top[0].balance, 100);
}

#[test]
fn leaderboard_returns_all_accounts_when_fewer_than_limit() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 1, 10);
    seed_balance(&engine, 2, 20);

    assert_eq!(engine.leaderboard(10).unwrap().len(), 2);
    assert_eq!(engine.leaderboard(1).unwrap().len(), 1);
}

#[test]
fn stats_aggregate_the_whole_ledger() {
    let engine = LedgerEngine::build_test().unwrap();
    engine.account(1).unwrap();
    engine.apply_referral(2, 1).unwrap(); // 1: +10, 2: +5
    seed_balance(&engine, 2, 105);
    engine.set_payout_id(2, "bob@upi").unwrap();
    engine.request_withdrawal(2).unwrap();
    engine.approve_withdrawal(OWNER, 2).unwrap();

    let stats = engine.stats(OWNER).unwrap();
    assert_eq!(stats.total_accounts, 2);
    assert_eq!(stats.total_balance, 10 + 5, "referrer reward + remainder");
    assert_eq!(stats.total_referrals, 1);
    assert_eq!(stats.total_withdrawals, 1);
}

#[test]
fn pending_withdrawals_list_only_pending_accounts() {
    let engine = LedgerEngine::build_test().unwrap();
    seed_balance(&engine, 1, 105);
    engine.set_payout_id(1, "a@upi").unwrap();
    engine.request_withdrawal(1).unwrap();
    seed_balance(&engine, 2, 500);

    let pending = engine.pending_withdrawals(OWNER).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, 1);
    assert_eq!(pending[0].rupees, 10);
    assert_eq!(pending[0].payout_id.as_deref(), Some("a@upi"));
}

#[test]
fn account_info_reports_bonus_availability() {
    let engine = LedgerEngine::build_test().unwrap();

    let info = engine.account_info(7).unwrap();
    assert!(info.bonus_available);

    engine.claim_daily_bonus(7).unwrap();
    let info = engine.account_info(7).unwrap();
    assert!(!info.bonus_available);
    assert_eq!(info.account.balance, 5);
}
