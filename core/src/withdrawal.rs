//! Withdrawal workflow: NoPending -> Pending -> NoPending.
//!
//! An ordinary account may only enter Pending (request); only the
//! configured owner identity may leave it (approve). The conversion is
//! exact — `rupees * conversion_rate` coins leave the balance and the
//! non-divisible remainder stays — so coins are conserved end to end.

use crate::{
    config::RewardConfig,
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    store::LedgerStore,
    types::{Coins, Rupees, UserId},
    Account,
};

#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    pub user_id: UserId,
    /// Rupee amount now awaiting approval.
    pub rupees: Rupees,
    /// Coins left on the balance after the conversion.
    pub remainder: Coins,
    pub payout_id: String,
}

#[derive(Debug, Clone)]
pub struct ApprovalReceipt {
    pub target_id: UserId,
    pub amount: Rupees,
    pub account: Account,
}

/// Convert the whole eligible balance into a pending rupee request.
pub fn request(
    store: &LedgerStore,
    rewards: &RewardConfig,
    id: UserId,
) -> LedgerResult<(WithdrawalReceipt, Vec<LedgerEvent>)> {
    let minimum = rewards.min_withdrawal();
    let rate = rewards.conversion_rate;

    let mut rupees = 0;
    let mut payout = String::new();
    let committed = store.update(id, |account, events| {
        if account.balance < minimum {
            return Err(LedgerError::InsufficientBalance { minimum });
        }
        let payout_id = account
            .payout_id
            .clone()
            .ok_or(LedgerError::PayoutDestinationNotSet)?;
        if account.pending_withdrawal.is_some() {
            return Err(LedgerError::WithdrawalAlreadyPending);
        }

        rupees = account.balance / rate;
        account.balance %= rate;
        account.pending_withdrawal = Some(rupees);
        payout = payout_id.clone();

        events.push(LedgerEvent::WithdrawalRequested {
            user_id: id,
            rupees,
            payout_id,
        });
        Ok(())
    })?;

    log::debug!("withdrawal requested: user {id}, {rupees} rupees");

    Ok((
        WithdrawalReceipt {
            user_id: id,
            rupees,
            remainder: committed.account.balance,
            payout_id: payout,
        },
        committed.events,
    ))
}

/// Complete the target's pending request. Only the configured owner
/// identity may do this; the id is compared, not authenticated.
pub fn approve(
    store: &LedgerStore,
    owner_id: UserId,
    admin_id: UserId,
    target_id: UserId,
) -> LedgerResult<(ApprovalReceipt, Vec<LedgerEvent>)> {
    if admin_id != owner_id {
        return Err(LedgerError::NotAuthorized);
    }

    let mut amount = 0;
    let committed = store.update(target_id, |account, events| {
        amount = account
            .pending_withdrawal
            .take()
            .ok_or(LedgerError::NoPendingWithdrawal)?;
        account.withdrawal_history.push(amount);
        events.push(LedgerEvent::WithdrawalCompleted {
            user_id: account.id,
            amount,
        });
        Ok(())
    })?;

    log::debug!("withdrawal completed: user {target_id}, {amount} rupees");

    Ok((
        ApprovalReceipt {
            target_id,
            amount,
            account: committed.account,
        },
        committed.events,
    ))
}

/// Set or overwrite the payout destination. The handle must contain
/// `'@'`; surrounding whitespace is stripped.
pub fn set_payout_id(
    store: &LedgerStore,
    id: UserId,
    payout_id: &str,
) -> LedgerResult<(Account, Vec<LedgerEvent>)> {
    let payout = payout_id.trim();
    if !payout.contains('@') {
        return Err(LedgerError::InvalidPayoutId);
    }
    let payout = payout.to_string();

    let committed = store.update(id, |account, events| {
        account.payout_id = Some(payout.clone());
        events.push(LedgerEvent::PayoutDestinationSet {
            user_id: id,
            payout_id: payout.clone(),
        });
        Ok(())
    })?;

    Ok((committed.account, committed.events))
}
