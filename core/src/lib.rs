//! rewards-core: a durable per-user reward ledger.
//!
//! Coin balances, one-time referral credits, a daily bonus, and a
//! two-phase (request / admin-approve) withdrawal workflow, persisted
//! in SQLite and shared by many concurrent callers.
//!
//! RULES:
//!   - Only the store talks to the database; every mutation is one
//!     atomic, durable transaction.
//!   - Business modules (referral, bonus, withdrawal) are closures
//!     applied through the store — they hold no state of their own.
//!   - The transport integrates through `LedgerEngine::dispatch` and
//!     the `EventSink` trait; the core never calls outward except to
//!     emit committed domain events.

pub mod account;
pub mod bonus;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod query;
pub mod referral;
pub mod store;
pub mod types;
pub mod withdrawal;

pub use account::Account;
pub use error::{LedgerError, LedgerResult};
