//! Read-only aggregate queries. Each runs in one transaction, so the
//! result is a consistent snapshot of the full account set — no
//! cross-account tearing.

use super::LedgerStore;
use crate::{
    error::LedgerResult,
    types::{Coins, Rupees, UserId},
};
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub balance: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_accounts: i64,
    pub total_balance: Coins,
    pub total_referrals: i64,
    pub total_withdrawals: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    pub user_id: UserId,
    pub rupees: Rupees,
    pub payout_id: Option<String>,
}

impl LedgerStore {
    /// Top `n` accounts by balance, descending. Equal balances rank the
    /// first-seen account higher, so the ordering is deterministic.
    pub fn leaderboard(&self, n: usize) -> LedgerResult<Vec<LeaderboardEntry>> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT user_id, balance FROM account
                 ORDER BY balance DESC, created_seq ASC
                 LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![i64::try_from(n).unwrap_or(i64::MAX)], |row| {
                    Ok(LeaderboardEntry {
                        user_id: row.get(0)?,
                        balance: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    pub fn stats(&self) -> LedgerResult<LedgerStats> {
        self.with_tx(|tx| {
            let (total_accounts, total_balance) = tx.query_row(
                "SELECT COUNT(*), COALESCE(SUM(balance), 0) FROM account",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let total_referrals =
                tx.query_row("SELECT COUNT(*) FROM referral", [], |row| row.get(0))?;
            let total_withdrawals =
                tx.query_row("SELECT COUNT(*) FROM withdrawal", [], |row| row.get(0))?;
            Ok(LedgerStats {
                total_accounts,
                total_balance,
                total_referrals,
                total_withdrawals,
            })
        })
    }

    /// Accounts currently awaiting approval, oldest account first.
    pub fn pending_withdrawals(&self) -> LedgerResult<Vec<PendingWithdrawal>> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT user_id, pending_withdrawal, payout_id FROM account
                 WHERE pending_withdrawal IS NOT NULL
                 ORDER BY created_seq ASC",
            )?;
            let entries = stmt
                .query_map([], |row| {
                    Ok(PendingWithdrawal {
                        user_id: row.get(0)?,
                        rupees: row.get(1)?,
                        payout_id: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }
}
