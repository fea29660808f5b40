//! Shared primitive types used across the entire ledger.

/// External user identity, as supplied by the transport. Opaque to the
/// core — it is compared, never interpreted.
pub type UserId = i64;

/// Smallest reward unit.
pub type Coins = i64;

/// Payout currency unit. `CONVERSION_RATE` coins = 1 rupee.
pub type Rupees = i64;
