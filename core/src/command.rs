//! The transport-facing command surface.
//!
//! The transport resolves an inbound event to `(acting user, intent)`
//! and hands the engine one `UserCommand`; the reply is rendered back
//! to the user. Variants are added per feature — never removed or
//! reordered.

use crate::{
    query::BalanceView,
    store::{LeaderboardEntry, LedgerStats, PendingWithdrawal},
    types::{Coins, Rupees, UserId},
    Account,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum UserCommand {
    Balance { user_id: UserId },
    Info { user_id: UserId },
    SetPayoutId { user_id: UserId, payout_id: String },
    ApplyReferral { user_id: UserId, referrer_id: UserId },
    ClaimDailyBonus { user_id: UserId },
    RequestWithdrawal { user_id: UserId },
    ApproveWithdrawal { admin_id: UserId, target_id: UserId },
    Leaderboard { limit: usize },
    Stats { admin_id: UserId },
    PendingWithdrawals { admin_id: UserId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Balance {
        #[serde(flatten)]
        view: BalanceView,
    },
    Info {
        account: Account,
        bonus_available: bool,
    },
    PayoutSet {
        payout_id: String,
    },
    ReferralApplied {
        referrer_id: UserId,
        bonus: Coins,
    },
    BonusGranted {
        amount: Coins,
    },
    WithdrawalRequested {
        rupees: Rupees,
        remainder: Coins,
    },
    WithdrawalApproved {
        target_id: UserId,
        amount: Rupees,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Stats {
        stats: LedgerStats,
    },
    PendingWithdrawals {
        entries: Vec<PendingWithdrawal>,
    },
    /// A validation failure: the specific user-visible message, state
    /// unchanged.
    Rejected {
        message: String,
    },
}
