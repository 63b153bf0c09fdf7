//! Error types for dataset configuration and loading.

use slice_common::SliceError;
use thiserror::Error;

/// Errors raised while fetching or decoding a partition.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure (connection, non-success status).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A required coordinate or variable is missing.
    #[error("missing data: {0}")]
    MissingData(String),
}

impl SourceError {
    /// Convert into the pipeline's `LoadFailed` error for `source_id`.
    pub fn into_slice_error(self, source_id: &str) -> SliceError {
        SliceError::load_failed(source_id, self.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Invalid dataset configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no partitions configured")]
    NoPartitions,

    #[error("partition {source_id}: start year {start} is after end year {end}")]
    InvalidRange {
        source_id: String,
        start: i32,
        end: i32,
    },

    #[error("partition {start}..={end} has an empty source")]
    EmptySource { start: i32, end: i32 },

    #[error("axis name for {0} cannot be empty")]
    EmptyAxisName(&'static str),
}
