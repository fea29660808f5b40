//! Read-only views over the ledger. Aggregates run against one
//! consistent snapshot (see the store's query transactions).

use crate::{
    config::RewardConfig,
    error::LedgerResult,
    store::{LeaderboardEntry, LedgerStats, LedgerStore, PendingWithdrawal},
    types::{Coins, Rupees, UserId},
    Account,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub coins: Coins,
    pub rupees: Rupees,
    /// Coins beyond the last whole rupee.
    pub remainder: Coins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account: Account,
    pub bonus_available: bool,
}

pub fn balance_of(
    store: &LedgerStore,
    rewards: &RewardConfig,
    id: UserId,
) -> LedgerResult<BalanceView> {
    let account = store.get(id)?;
    Ok(BalanceView {
        coins: account.balance,
        rupees: account.balance / rewards.conversion_rate,
        remainder: account.balance % rewards.conversion_rate,
    })
}

/// The "my info" view: full snapshot plus whether today's bonus is
/// still claimable.
pub fn account_info(store: &LedgerStore, id: UserId, today: NaiveDate) -> LedgerResult<AccountInfo> {
    let account = store.get(id)?;
    let bonus_available = account.last_bonus_date.is_none_or(|last| last < today);
    Ok(AccountInfo {
        account,
        bonus_available,
    })
}

pub fn leaderboard(store: &LedgerStore, n: usize) -> LedgerResult<Vec<LeaderboardEntry>> {
    store.leaderboard(n)
}

pub fn stats(store: &LedgerStore) -> LedgerResult<LedgerStats> {
    store.stats()
}

pub fn pending_withdrawals(store: &LedgerStore) -> LedgerResult<Vec<PendingWithdrawal>> {
    store.pending_withdrawals()
}
