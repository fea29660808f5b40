//! Daily bonus — a fixed credit at most once per UTC calendar day.

use crate::{
    config::RewardConfig,
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    store::LedgerStore,
    types::{Coins, UserId},
    Account,
};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct BonusReceipt {
    pub account: Account,
    pub amount: Coins,
}

/// Claim today's bonus. For a fixed account, at most one claim per
/// distinct date succeeds, regardless of call frequency or concurrency.
/// The guard also refuses a `today` earlier than the recorded last
/// claim, so `last_bonus_date` never moves backwards.
pub fn claim(
    store: &LedgerStore,
    rewards: &RewardConfig,
    id: UserId,
    today: NaiveDate,
) -> LedgerResult<(BonusReceipt, Vec<LedgerEvent>)> {
    let amount = rewards.daily_bonus;

    let committed = store.update(id, |account, events| {
        if account.last_bonus_date.is_some_and(|last| last >= today) {
            return Err(LedgerError::AlreadyClaimedToday);
        }
        account.balance += amount;
        account.last_bonus_date = Some(today);
        events.push(LedgerEvent::DailyBonusGranted {
            user_id: id,
            amount,
            date: today,
        });
        Ok(())
    })?;

    Ok((
        BonusReceipt {
            account: committed.account,
            amount,
        },
        committed.events,
    ))
}
