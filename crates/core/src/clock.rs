//! Source of "today" for age arithmetic and the recorded-date stamp.
//!
//! Every as-of computation goes through a [`Clock`] so derivation stays a pure function of
//! its inputs once the date is fixed.

use chrono::NaiveDate;

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
