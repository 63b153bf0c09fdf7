//! Calendar month handling for monthly time axes.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based month (1 = January).
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Calendar month of a UTC timestamp.
    pub fn of(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// Whether `month` is in 1..=12.
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Calendar month of a time-axis marker given in milliseconds since the
/// Unix epoch.
///
/// The month is always computed in UTC so the result does not depend on the
/// local timezone. Non-finite markers and markers outside the representable
/// date range yield `None`.
pub fn month_of_epoch_millis(millis: f64) -> Option<YearMonth> {
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| YearMonth::of(&dt))
}

/// A user selection: which variable to show for which month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceRequest {
    pub variable: String,
    pub year: i32,
    pub month: u32,
}

impl SliceRequest {
    pub fn new(variable: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            variable: variable.into(),
            year,
            month,
        }
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::new(self.year, self.month)
    }
}

impl fmt::Display for SliceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.variable, self.year_month())
    }
}
