//! Partitioned monthly raster datasets.
//!
//! A long gridded record (monthly values on a latitude/longitude grid) is
//! split into partitions by year range. This crate finds the partition for a
//! year, loads and memoizes decoded partitions, locates a month on the time
//! axis and cuts the 2-D slice for that month out of the flattened
//! `(time, lat, lon)` array.
//!
//! # Architecture
//!
//! ```text
//! (variable, year, month)
//!      │
//!      ├─► PartitionIndex::resolve(year)      → PartitionDescriptor
//!      │
//!      ├─► DatasetCache::get_or_load(source)  → Arc<Dataset>
//!      │         │
//!      │         ├─► hit: return the decoded partition
//!      │         └─► miss: DatasetSource::load (deduplicated)
//!      │
//!      ├─► find_time_index(times, year, month) → TimeIndex
//!      │
//!      └─► extract_slice(values, t, H, W)     → Slice2D
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod partition;
pub mod slice;
pub mod source;
pub mod time_axis;
pub mod types;

pub use cache::{CacheStats, DatasetCache};
pub use config::{AxesConfig, DatasetConfig};
pub use error::{ConfigError, SourceError};
pub use partition::{PartitionDescriptor, PartitionIndex};
pub use slice::{extract_slice, Slice2D};
pub use source::{DatasetSource, JsonDatasetSource};
pub use time_axis::{find_time_index, TimeIndex};
pub use types::{shape_len, Dataset, VariableArray};
