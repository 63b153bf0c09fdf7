//! Year-range partitions of a dataset.

use serde::{Deserialize, Serialize};
use slice_common::SliceError;

/// One separately loadable part of the dataset, covering an inclusive year range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub start: i32,
    pub end: i32,
    /// URL or path handed to the dataset source.
    #[serde(rename = "source")]
    pub source_id: String,
}

impl PartitionDescriptor {
    pub fn new(start: i32, end: i32, source_id: impl Into<String>) -> Self {
        Self {
            start,
            end,
            source_id: source_id.into(),
        }
    }

    /// Whether `year` lies in `[start, end]`.
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

/// Ordered list of partitions, searched front to back.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    partitions: Vec<PartitionDescriptor>,
}

impl PartitionIndex {
    pub fn new(partitions: Vec<PartitionDescriptor>) -> Self {
        Self { partitions }
    }

    /// Find the partition holding `year`.
    ///
    /// The first descriptor whose range contains the year wins, so an
    /// overlapping configuration still resolves deterministically to the
    /// earliest-listed partition.
    pub fn resolve(&self, year: i32) -> Result<&PartitionDescriptor, SliceError> {
        self.partitions
            .iter()
            .find(|p| p.contains(year))
            .ok_or(SliceError::PartitionNotFound { year })
    }

    pub fn partitions(&self) -> &[PartitionDescriptor] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Lowest start and highest end year over all partitions.
    pub fn coverage(&self) -> Option<(i32, i32)> {
        let start = self.partitions.iter().map(|p| p.start).min()?;
        let end = self.partitions.iter().map(|p| p.end).max()?;
        Some((start, end))
    }

    /// Every covered year, ascending and without duplicates.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .partitions
            .iter()
            .flat_map(|p| p.start..=p.end)
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Check that partitions, in listed order, tile one contiguous year span.
    ///
    /// Returns a description of the first gap, overlap or out-of-order pair.
    pub fn check_contiguous(&self) -> Result<(), String> {
        for pair in self.partitions.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start <= prev.end {
                return Err(format!(
                    "partition {}..={} overlaps or precedes {}..={}",
                    next.start, next.end, prev.start, prev.end
                ));
            }
            if next.start > prev.end + 1 {
                return Err(format!(
                    "gap between {} and {}: years {}..={} are not covered",
                    prev.source_id,
                    next.source_id,
                    prev.end + 1,
                    next.start - 1
                ));
            }
        }
        Ok(())
    }
}
