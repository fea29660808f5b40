//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. Business modules are
//! expressed as closures applied through `get` / `update` /
//! `update_with_peer` — the sole mutation paths. Each call is one
//! transaction, committed (hence durable) before the call returns; an
//! `Err` from the closure aborts with no observable mutation.
//!
//! Concurrent callers serialize on the connection lock. The lock is
//! never held across anything but the transaction itself — event
//! delivery and all transport I/O happen after commit.

mod account;
mod query;

pub use query::{LeaderboardEntry, LedgerStats, PendingWithdrawal};

use crate::{
    error::{LedgerError, LedgerResult},
    event::{event_type_name, EventLogEntry, LedgerEvent},
    types::UserId,
    Account,
};
use anyhow::Context;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::Path;

pub struct LedgerStore {
    conn: Mutex<Connection>,
    recovered: bool,
}

/// Result of a committed single-account update.
#[derive(Debug)]
pub struct Committed {
    pub account: Account,
    pub events: Vec<LedgerEvent>,
}

/// Result of a committed two-account update.
pub struct PairCommitted {
    pub caller: Account,
    /// `None` when the peer account did not exist and the closure chose
    /// to succeed anyway (no closure currently does).
    pub peer: Option<Account>,
    pub events: Vec<LedgerEvent>,
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path` and bring the
    /// schema up to date.
    ///
    /// An unreadable or unmigratable file is moved aside to
    /// `<path>.corrupt-<n>` and replaced by an empty store; the caller
    /// must check `recovered_from_corruption()` and surface the signal.
    /// A malformed store never crashes the process and is never
    /// silently discarded.
    pub fn open(path: &str) -> LedgerResult<Self> {
        match Self::open_at(path) {
            Ok(store) => Ok(store),
            Err(err) => {
                log::warn!("ledger store at {path} is unreadable: {err}");
                let quarantined = quarantine(path)?;
                log::warn!("corrupt store moved to {quarantined}; starting from an empty store");
                let mut store = Self::open_at(path)?;
                store.recovered = true;
                Ok(store)
            }
        }
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            recovered: false,
        })
    }

    fn open_at(path: &str) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: readers never block the writer, and a crash between
        // operations never leaves a half-written account.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            recovered: false,
        })
    }

    /// True when `open` had to discard a corrupt file. The previous
    /// history is in the quarantined copy, not in this store.
    pub fn recovered_from_corruption(&self) -> bool {
        self.recovered
    }

    // ── Accounts ───────────────────────────────────────────────

    /// Account snapshot, creating the default record on first contact.
    pub fn get(&self, id: UserId) -> LedgerResult<Account> {
        self.with_tx(|tx| {
            let (account, created) = account::load_or_create(tx, id)?;
            if created {
                append_event_tx(tx, &LedgerEvent::AccountCreated { user_id: id })?;
            }
            Ok(account)
        })
    }

    /// Atomic read-modify-write of one account. The closure observes
    /// the current state (a default record is created on first contact)
    /// and either mutates it and pushes the events to emit, or returns
    /// an error that aborts the update with no observable mutation.
    pub fn update<F>(&self, id: UserId, f: F) -> LedgerResult<Committed>
    where
        F: FnOnce(&mut Account, &mut Vec<LedgerEvent>) -> LedgerResult<()>,
    {
        self.with_tx(|tx| {
            let (before, created) = account::load_or_create(tx, id)?;
            let mut after = before.clone();
            let mut events = Vec::new();
            if created {
                events.push(LedgerEvent::AccountCreated { user_id: id });
            }
            f(&mut after, &mut events)?;
            account::persist(tx, &before, &after)?;
            for event in &events {
                append_event_tx(tx, event)?;
            }
            Ok(Committed {
                account: after,
                events,
            })
        })
    }

    /// Atomic read-modify-write spanning two distinct accounts in one
    /// transaction. The caller's account is created if absent; the peer
    /// is handed to the closure as `None` when it does not exist, so the
    /// closure decides which error that is. Accounts are loaded in
    /// ascending-id order — the fixed global order that rules out
    /// lock-order inversion if per-account locking ever replaces the
    /// single connection.
    pub fn update_with_peer<F>(
        &self,
        caller: UserId,
        peer: UserId,
        f: F,
    ) -> LedgerResult<PairCommitted>
    where
        F: FnOnce(&mut Account, Option<&mut Account>, &mut Vec<LedgerEvent>) -> LedgerResult<()>,
    {
        debug_assert_ne!(caller, peer, "pair update requires distinct accounts");
        self.with_tx(|tx| {
            let mut events = Vec::new();
            let (before_caller, before_peer) = if caller < peer {
                let (bc, created) = account::load_or_create(tx, caller)?;
                if created {
                    events.push(LedgerEvent::AccountCreated { user_id: caller });
                }
                (bc, account::try_load(tx, peer)?)
            } else {
                let bp = account::try_load(tx, peer)?;
                let (bc, created) = account::load_or_create(tx, caller)?;
                if created {
                    events.push(LedgerEvent::AccountCreated { user_id: caller });
                }
                (bc, bp)
            };

            let mut after_caller = before_caller.clone();
            let mut after_peer = before_peer.clone();
            f(&mut after_caller, after_peer.as_mut(), &mut events)?;

            account::persist(tx, &before_caller, &after_caller)?;
            if let (Some(before), Some(after)) = (&before_peer, &after_peer) {
                account::persist(tx, before, after)?;
            }
            for event in &events {
                append_event_tx(tx, event)?;
            }
            Ok(PairCommitted {
                caller: after_caller,
                peer: after_peer,
                events,
            })
        })
    }

    // ── Event log ──────────────────────────────────────────────

    /// Record an event outside any account mutation (startup signals).
    pub fn append_event(&self, event: &LedgerEvent) -> LedgerResult<()> {
        self.with_tx(|tx| append_event_tx(tx, event))
    }

    /// Events with log id greater than `after`, oldest first. External
    /// consumers poll this for at-least-once delivery and dedup on
    /// `event_id`.
    pub fn events_after(&self, after: i64, limit: usize) -> LedgerResult<Vec<EventLogEntry>> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, event_id, event_type, payload, recorded_at
                 FROM event_log WHERE id > ?1
                 ORDER BY id ASC LIMIT ?2",
            )?;
            let entries = stmt
                .query_map(
                    params![after, i64::try_from(limit).unwrap_or(i64::MAX)],
                    |row| {
                        Ok(EventLogEntry {
                            id: Some(row.get(0)?),
                            event_id: row.get(1)?,
                            event_type: row.get(2)?,
                            payload: row.get(3)?,
                            recorded_at: row.get(4)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    // ── Transaction plumbing ───────────────────────────────────

    fn with_tx<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> LedgerResult<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback()?;
                Err(err)
            }
        }
    }
}

/// Apply all schema migrations in order.
fn migrate(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
    conn.execute_batch(include_str!("../../../migrations/002_referrals.sql"))?;
    conn.execute_batch(include_str!("../../../migrations/003_withdrawals.sql"))?;
    Ok(())
}

fn append_event_tx(tx: &Transaction<'_>, event: &LedgerEvent) -> LedgerResult<()> {
    tx.execute(
        "INSERT INTO event_log (event_id, event_type, payload, recorded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            uuid::Uuid::new_v4().to_string(),
            event_type_name(event),
            serde_json::to_string(event)?,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Move an unreadable store file (and stale WAL sidecars) out of the
/// way, returning the quarantine path.
fn quarantine(path: &str) -> LedgerResult<String> {
    let mut n = 1;
    let target = loop {
        let candidate = format!("{path}.corrupt-{n}");
        if !Path::new(&candidate).exists() {
            break candidate;
        }
        n += 1;
        if n > 1000 {
            return Err(LedgerError::Other(anyhow::anyhow!(
                "no free quarantine name for {path}"
            )));
        }
    };
    std::fs::rename(path, &target)
        .with_context(|| format!("cannot quarantine corrupt store {path}"))?;
    let _ = std::fs::remove_file(format!("{path}-wal"));
    let _ = std::fs::remove_file(format!("{path}-shm"));
    Ok(target)
}
