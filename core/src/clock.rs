//! Calendar clock — owns "today" for the daily-bonus calendar.
//!
//! The bonus grant compares against the UTC calendar date at call time.
//! Tests pin the date with `FixedClock`.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;

pub trait LedgerClock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock UTC date.
pub struct SystemClock;

impl LedgerClock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Pinned date for tests; settable and advanceable.
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock() = today;
    }

    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock();
        *today = *today + chrono::Duration::days(days);
    }
}

impl LedgerClock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}
