//! Configuration for the partitioned dataset.

use crate::error::ConfigError;
use crate::partition::{PartitionDescriptor, PartitionIndex};
use serde::{Deserialize, Serialize};

/// Where the partitions live and how their coordinates are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Partitions in lookup order.
    pub partitions: Vec<PartitionDescriptor>,

    /// Names of the coordinate variables inside each partition.
    #[serde(default)]
    pub axes: AxesConfig,
}

/// Names of the latitude, longitude and time coordinate variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxesConfig {
    #[serde(default = "default_latitude")]
    pub latitude: String,
    #[serde(default = "default_longitude")]
    pub longitude: String,
    #[serde(default = "default_time")]
    pub time: String,
}

fn default_latitude() -> String {
    "latitude".to_string()
}

fn default_longitude() -> String {
    "longitude".to_string()
}

fn default_time() -> String {
    "valid_time".to_string()
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            time: default_time(),
        }
    }
}

impl Default for DatasetConfig {
    /// The four 19-year parts of the 1950-2025 suitability record.
    fn default() -> Self {
        Self {
            partitions: vec![
                PartitionDescriptor::new(1950, 1968, "arabica_suitability_part1.json"),
                PartitionDescriptor::new(1969, 1987, "arabica_suitability_part2.json"),
                PartitionDescriptor::new(1988, 2006, "arabica_suitability_part3.json"),
                PartitionDescriptor::new(2007, 2025, "arabica_suitability_part4.json"),
            ],
            axes: AxesConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// Prefix relative partition sources with `base` (a URL or directory).
    ///
    /// Sources that are already absolute paths or URLs are left unchanged.
    pub fn rebase_sources(&mut self, base: &str) {
        let base = base.trim_end_matches('/');
        for partition in &mut self.partitions {
            if !is_absolute_source(&partition.source_id) {
                partition.source_id = format!("{}/{}", base, partition.source_id);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Gaps or overlaps between partitions are not rejected here; lookup
    /// stays deterministic (first match wins) and callers may report them
    /// via [`PartitionIndex::check_contiguous`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions.is_empty() {
            return Err(ConfigError::NoPartitions);
        }

        for p in &self.partitions {
            if p.start > p.end {
                return Err(ConfigError::InvalidRange {
                    source_id: p.source_id.clone(),
                    start: p.start,
                    end: p.end,
                });
            }
            if p.source_id.trim().is_empty() {
                return Err(ConfigError::EmptySource {
                    start: p.start,
                    end: p.end,
                });
            }
        }

        if self.axes.latitude.is_empty() {
            return Err(ConfigError::EmptyAxisName("latitude"));
        }
        if self.axes.longitude.is_empty() {
            return Err(ConfigError::EmptyAxisName("longitude"));
        }
        if self.axes.time.is_empty() {
            return Err(ConfigError::EmptyAxisName("time"));
        }

        Ok(())
    }

    /// Build the lookup index over the configured partitions.
    pub fn partition_index(&self) -> PartitionIndex {
        PartitionIndex::new(self.partitions.clone())
    }
}

fn is_absolute_source(source: &str) -> bool {
    source.starts_with('/') || source.contains("://")
}
