//! Account row mapping: load, create-on-first-contact, write-back.

use crate::{
    error::{LedgerError, LedgerResult},
    types::UserId,
    Account,
};
use anyhow::anyhow;
use rusqlite::{params, OptionalExtension, Transaction};

/// Load the account, creating the default record (with the next
/// `created_seq`) if absent. Returns the snapshot and whether the row
/// was created by this call.
pub(super) fn load_or_create(tx: &Transaction<'_>, id: UserId) -> LedgerResult<(Account, bool)> {
    let created = tx.execute(
        "INSERT OR IGNORE INTO account (user_id, created_seq)
         VALUES (?1, (SELECT COALESCE(MAX(created_seq), 0) + 1 FROM account))",
        params![id],
    )? > 0;
    let account = load(tx, id)?;
    Ok((account, created))
}

pub(super) fn try_load(tx: &Transaction<'_>, id: UserId) -> LedgerResult<Option<Account>> {
    let exists: Option<i64> = tx
        .query_row(
            "SELECT user_id FROM account WHERE user_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match exists {
        Some(_) => Ok(Some(load(tx, id)?)),
        None => Ok(None),
    }
}

fn load(tx: &Transaction<'_>, id: UserId) -> LedgerResult<Account> {
    let (mut account, bonus_date) = tx.query_row(
        "SELECT user_id, balance, referred_by, used_referral, payout_id,
                pending_withdrawal, last_bonus_date, created_seq
         FROM account WHERE user_id = ?1",
        params![id],
        |row| {
            Ok((
                Account {
                    id: row.get(0)?,
                    balance: row.get(1)?,
                    referred_by: row.get(2)?,
                    used_referral: row.get(3)?,
                    payout_id: row.get(4)?,
                    pending_withdrawal: row.get(5)?,
                    withdrawal_history: Vec::new(),
                    referrals: Vec::new(),
                    last_bonus_date: None,
                    created_seq: row.get(7)?,
                },
                row.get::<_, Option<String>>(6)?,
            ))
        },
    )?;

    account.last_bonus_date = match bonus_date {
        Some(raw) => Some(
            chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| LedgerError::Other(anyhow!("bad last_bonus_date {raw:?}: {e}")))?,
        ),
        None => None,
    };

    let mut stmt =
        tx.prepare("SELECT referred_id FROM referral WHERE referrer_id = ?1 ORDER BY id ASC")?;
    account.referrals = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt =
        tx.prepare("SELECT amount FROM withdrawal WHERE user_id = ?1 ORDER BY id ASC")?;
    account.withdrawal_history = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(account)
}

/// Write the updated state back. The scalar columns are overwritten;
/// `referrals` and `withdrawal_history` are append-only, so only the
/// entries past the loaded prefix are inserted.
pub(super) fn persist(tx: &Transaction<'_>, before: &Account, after: &Account) -> LedgerResult<()> {
    debug_assert_eq!(before.id, after.id);
    debug_assert!(after.referrals.starts_with(&before.referrals));
    debug_assert!(after.withdrawal_history.starts_with(&before.withdrawal_history));

    tx.execute(
        "UPDATE account
         SET balance = ?2, referred_by = ?3, used_referral = ?4,
             payout_id = ?5, pending_withdrawal = ?6, last_bonus_date = ?7
         WHERE user_id = ?1",
        params![
            after.id,
            after.balance,
            after.referred_by,
            after.used_referral,
            after.payout_id,
            after.pending_withdrawal,
            after.last_bonus_date.map(|d| d.to_string()),
        ],
    )?;

    for &referred in &after.referrals[before.referrals.len()..] {
        tx.execute(
            "INSERT INTO referral (referrer_id, referred_id) VALUES (?1, ?2)",
            params![after.id, referred],
        )?;
    }

    for &amount in &after.withdrawal_history[before.withdrawal_history.len()..] {
        tx.execute(
            "INSERT INTO withdrawal (user_id, amount, completed_at) VALUES (?1, ?2, ?3)",
            params![after.id, amount, chrono::Utc::now().to_rfc3339()],
        )?;
    }

    Ok(())
}
