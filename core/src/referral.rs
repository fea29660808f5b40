//! Referral application — a one-time edge crediting both parties.
//!
//! The whole operation is a single two-account transaction: the
//! used-referral flag, the edge, and both credits commit together, so
//! concurrent retries cannot double-credit.

use crate::{
    config::RewardConfig,
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    store::LedgerStore,
    types::{Coins, UserId},
    Account,
};

#[derive(Debug, Clone)]
pub struct ReferralReceipt {
    /// The referred account after the credit.
    pub referred: Account,
    pub referrer_id: UserId,
    /// Coins credited to the referrer.
    pub reward: Coins,
    /// Coins credited to the referred account.
    pub bonus: Coins,
}

/// Apply the referral edge `referrer -> referred` exactly once.
///
/// Fails with `SelfReferral`, `ReferralAlreadyUsed`, `UnknownReferrer`
/// or `DuplicateReferral`; any failure leaves both accounts untouched.
/// Calling again after a success always fails with
/// `ReferralAlreadyUsed`.
pub fn apply(
    store: &LedgerStore,
    rewards: &RewardConfig,
    referred_id: UserId,
    referrer_id: UserId,
) -> LedgerResult<(ReferralReceipt, Vec<LedgerEvent>)> {
    if referred_id == referrer_id {
        return Err(LedgerError::SelfReferral);
    }

    let reward = rewards.referral_reward;
    let bonus = rewards.referral_bonus;

    let committed = store.update_with_peer(referred_id, referrer_id, |referred, referrer, events| {
        if referred.used_referral {
            return Err(LedgerError::ReferralAlreadyUsed);
        }
        let referrer = referrer.ok_or(LedgerError::UnknownReferrer)?;
        if referrer.referrals.contains(&referred.id) {
            return Err(LedgerError::DuplicateReferral);
        }

        referrer.referrals.push(referred.id);
        referrer.balance += reward;
        referred.balance += bonus;
        referred.referred_by = Some(referrer.id);
        referred.used_referral = true;

        events.push(LedgerEvent::ReferralApplied {
            referrer_id: referrer.id,
            referred_id: referred.id,
            reward,
            bonus,
        });
        Ok(())
    })?;

    log::debug!("referral applied: {referrer_id} -> {referred_id} (+{reward}/+{bonus})");

    Ok((
        ReferralReceipt {
            referred: committed.caller,
            referrer_id,
            reward,
            bonus,
        },
        committed.events,
    ))
}
