//! Calendar month value object used to bucket activity.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A calendar month in UTC, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a YearMonth, validating `month` is in 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::out_of_range("month", 1, 12, month as i32));
        }
        Ok(Self { year, month })
    }

    pub(crate) fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month `months` before this one.
    pub fn minus_months(&self, months: u32) -> Self {
        let index = self.index() - i64::from(months);
        Self::from_index(index)
    }

    /// Number of whole months from `earlier` to `self` (negative if `earlier`
    /// is after `self`).
    pub fn months_since(&self, earlier: &YearMonth) -> i64 {
        self.index() - earlier.index()
    }

    fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
