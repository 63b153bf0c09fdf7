//! Slice viewer service library.
//!
//! Turns a (variable, year, month) selection into a colored raster overlay
//! over a partitioned monthly dataset.

pub mod config;
pub mod pipeline;
pub mod surface;

pub use config::{load_viewer_config, ViewerConfig};
pub use pipeline::{Orchestrator, OverlaySummary, PipelineError, PipelineStage, UpdateOutcome};
pub use surface::PngFileSurface;
