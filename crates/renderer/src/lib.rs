//! Raster overlay rendering for gridded slices.
//!
//! - Color mapping (threshold bands and linear ramps)
//! - Color scheme configuration
//! - RGBA pixel buffers and PNG encoding
//! - The single-overlay display slot

pub mod gradient;
pub mod overlay;
pub mod png;
pub mod style;

pub use gradient::{
    interpolate_color, Color, ColorMapper, ColorScheme, MissingValue, RampAnchors, RangeSource,
    ThresholdBand, ValueRange,
};
pub use overlay::{DisplaySurface, OverlayRenderer, PixelBuffer, RenderError, RenderedOverlay};
pub use style::{ColorSchemeConfig, StyleError};
