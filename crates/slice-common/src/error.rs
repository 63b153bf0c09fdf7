//! Error taxonomy for the slice pipeline.

use serde::Serialize;
use thiserror::Error;

/// Errors that can end a slice pipeline run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SliceError {
    // === No data ===
    #[error("No data for year {year}: outside configured partitions")]
    PartitionNotFound { year: i32 },

    #[error("No data for {year}-{month:02} in {source_id}")]
    TimeNotFound {
        year: i32,
        month: u32,
        source_id: String,
    },

    #[error("Unknown variable: {variable}")]
    UnknownVariable { variable: String },

    // === Loading ===
    #[error("Failed to load {source_id}: {message}")]
    LoadFailed { source_id: String, message: String },

    // === Data integrity ===
    #[error("Dimension mismatch: {context} (expected {expected} values, found {actual})")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    // === Display ===
    #[error("Rendering failed: {message}")]
    RenderFailed { message: String },
}

/// Coarse classification of a [`SliceError`], used in reports and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PartitionNotFound,
    TimeNotFound,
    UnknownVariable,
    LoadFailed,
    DimensionMismatch,
    RenderFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PartitionNotFound => "partition_not_found",
            ErrorKind::TimeNotFound => "time_not_found",
            ErrorKind::UnknownVariable => "unknown_variable",
            ErrorKind::LoadFailed => "load_failed",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::RenderFailed => "render_failed",
        }
    }
}

impl SliceError {
    pub fn load_failed(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn render_failed(message: impl Into<String>) -> Self {
        Self::RenderFailed {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SliceError::PartitionNotFound { .. } => ErrorKind::PartitionNotFound,
            SliceError::TimeNotFound { .. } => ErrorKind::TimeNotFound,
            SliceError::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            SliceError::LoadFailed { .. } => ErrorKind::LoadFailed,
            SliceError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            SliceError::RenderFailed { .. } => ErrorKind::RenderFailed,
        }
    }

    /// Whether the user can expect a different selection (or a retry) to succeed.
    ///
    /// Data-integrity and display failures are not recoverable for the
    /// request that produced them.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SliceError::DimensionMismatch { .. } | SliceError::RenderFailed { .. }
        )
    }

    /// Whether the error means "nothing to show" rather than a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            SliceError::PartitionNotFound { .. } | SliceError::TimeNotFound { .. }
        )
    }
}
