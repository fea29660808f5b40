//! The persisted ledger record for one external user id.

use crate::types::{Coins, Rupees, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one account, aggregated from the `account` row
/// and its append-only `referral` / `withdrawal` child rows.
///
/// Invariants (hold at every observable point):
///   - `balance >= 0`
///   - `used_referral == true` iff `referred_by` is set
///   - the account never appears in its own `referrals`
///   - `pending_withdrawal`, when set, is positive
///   - `last_bonus_date` never moves backwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub balance: Coins,
    pub referred_by: Option<UserId>,
    pub used_referral: bool,
    pub referrals: Vec<UserId>,
    pub payout_id: Option<String>,
    pub pending_withdrawal: Option<Rupees>,
    pub withdrawal_history: Vec<Rupees>,
    pub last_bonus_date: Option<NaiveDate>,
    /// Monotone first-contact sequence number. Leaderboard tie-break:
    /// of two equal balances, the first-seen account ranks higher.
    pub created_seq: i64,
}

impl Account {
    /// Fresh account with default zero/empty fields, as created on
    /// first contact.
    pub fn new(id: UserId, created_seq: i64) -> Self {
        Self {
            id,
            balance: 0,
            referred_by: None,
            used_referral: false,
            referrals: Vec::new(),
            payout_id: None,
            pending_withdrawal: None,
            withdrawal_history: Vec::new(),
            last_bonus_date: None,
            created_seq,
        }
    }
}
