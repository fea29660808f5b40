use crate::types::Coins;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    // ── Validation — user-facing, state unchanged ─────────────────
    #[error("you cannot refer yourself")]
    SelfReferral,

    #[error("a referral was already used on this account")]
    ReferralAlreadyUsed,

    #[error("no account exists for that referral code")]
    UnknownReferrer,

    #[error("this referral was already recorded")]
    DuplicateReferral,

    #[error("balance is below the minimum withdrawal of {minimum} coins")]
    InsufficientBalance { minimum: Coins },

    #[error("no payout destination is set")]
    PayoutDestinationNotSet,

    #[error("a withdrawal is already pending")]
    WithdrawalAlreadyPending,

    #[error("no pending withdrawal to approve")]
    NoPendingWithdrawal,

    #[error("the daily bonus was already claimed today")]
    AlreadyClaimedToday,

    #[error("not authorized")]
    NotAuthorized,

    #[error("payout destination must contain '@'")]
    InvalidPayoutId,

    // ── Integrity — operational, logged, never user-caused ────────
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    /// Validation errors are expected, map to a user-visible message,
    /// and leave ledger state unchanged. Everything else is operational.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            LedgerError::Database(_) | LedgerError::Serialization(_) | LedgerError::Other(_)
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
