//! Domain events — everything the outside world is told about.
//!
//! RULE: Events are emitted only by committed ledger mutations. A sink
//! failure never rolls a committed mutation back; each occurrence is
//! persisted to `event_log` inside the mutating transaction, so
//! consumers get at-least-once delivery and dedup on `event_id`.

use crate::types::{Coins, Rupees, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every event the ledger emits. Variants are added, never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    AccountCreated {
        user_id: UserId,
    },
    ReferralApplied {
        referrer_id: UserId,
        referred_id: UserId,
        reward: Coins,
        bonus: Coins,
    },
    DailyBonusGranted {
        user_id: UserId,
        amount: Coins,
        date: NaiveDate,
    },
    PayoutDestinationSet {
        user_id: UserId,
        payout_id: String,
    },
    WithdrawalRequested {
        user_id: UserId,
        rupees: Rupees,
        payout_id: String,
    },
    WithdrawalCompleted {
        user_id: UserId,
        amount: Rupees,
    },
    /// The persisted store was unreadable at open and was replaced by an
    /// empty one. History before this point is gone; an operator must
    /// look at the quarantined file.
    StoreRecovered {
        path: String,
    },
}

/// Stable string name for an event variant, used for the `event_type`
/// column in `event_log`.
pub fn event_type_name(event: &LedgerEvent) -> &'static str {
    match event {
        LedgerEvent::AccountCreated { .. } => "account_created",
        LedgerEvent::ReferralApplied { .. } => "referral_applied",
        LedgerEvent::DailyBonusGranted { .. } => "daily_bonus_granted",
        LedgerEvent::PayoutDestinationSet { .. } => "payout_destination_set",
        LedgerEvent::WithdrawalRequested { .. } => "withdrawal_requested",
        LedgerEvent::WithdrawalCompleted { .. } => "withdrawal_completed",
        LedgerEvent::StoreRecovered { .. } => "store_recovered",
    }
}

/// An event as persisted to `event_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    /// Random unique id; at-least-once consumers dedup on this.
    pub event_id: String,
    pub event_type: String,
    /// JSON-serialized `LedgerEvent`.
    pub payload: String,
    pub recorded_at: String,
}

/// Outbound delivery of committed events. Delivery is best-effort:
/// the engine logs a failed `deliver` and moves on.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &LedgerEvent) -> anyhow::Result<()>;
}
