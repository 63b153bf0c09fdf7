//! Locating a calendar month on a partition's time axis.

use slice_common::{month_of_epoch_millis, YearMonth};
use std::fmt;

/// 0-based position on a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeIndex(pub usize);

impl TimeIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Find the first time step whose UTC calendar month is `year`-`month`.
///
/// `axis` holds one marker per step in milliseconds since the Unix epoch.
/// Markers that cannot be converted to a date are skipped. Returns `None`
/// when nothing matches, including for an empty axis or a month outside
/// 1..=12; a missing month at a partition edge is an expected outcome.
pub fn find_time_index(axis: &[f64], year: i32, month: u32) -> Option<TimeIndex> {
    let wanted = YearMonth::new(year, month);
    if !wanted.is_valid() {
        return None;
    }

    axis.iter()
        .position(|&marker| month_of_epoch_millis(marker) == Some(wanted))
        .map(TimeIndex)
}

/// Distinct calendar months present on the axis, in axis order.
pub fn available_months(axis: &[f64]) -> Vec<YearMonth> {
    let mut months: Vec<YearMonth> = Vec::with_capacity(axis.len());
    for ym in axis.iter().filter_map(|&m| month_of_epoch_millis(m)) {
        if !months.contains(&ym) {
            months.push(ym);
        }
    }
    months
}
