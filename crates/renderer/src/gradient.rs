//! Value-to-color mapping for gridded data.
//!
//! Two schemes are supported:
//! - discrete threshold bands with fixed colors
//! - a continuous linear ramp between two or three anchor colors
//!
//! Missing cells (NaN or a declared fill value) always map to a fully
//! transparent color so the base map shows through.

use serde::{Deserialize, Serialize};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear color interpolation
///
/// `t` is clamped to [0, 1]; `t = 0` yields `color1` and `t = 1` yields
/// `color2` exactly.
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| ((a as f32 * t_inv) + (b as f32 * t)).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// Inclusive value range a ramp is stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Position of `value` within the range, clamped to [0, 1].
    ///
    /// A degenerate range (min == max) maps every value to the middle.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Smallest range covering the given values, ignoring those `skip` rejects.
    pub fn observed<F>(values: &[f32], skip: F) -> Option<Self>
    where
        F: Fn(f32) -> bool,
    {
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && !skip(*v))
            .fold(None, |acc, v| match acc {
                None => Some(Self::new(v, v)),
                Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
            })
    }
}

/// Which cells count as "no data".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MissingValue {
    /// Fill constant marking missing cells, in addition to NaN.
    pub fill_value: Option<f32>,
}

impl MissingValue {
    pub fn new(fill_value: Option<f32>) -> Self {
        Self { fill_value }
    }

    pub fn is_missing(&self, value: f32) -> bool {
        value.is_nan() || self.fill_value == Some(value)
    }
}

/// One discrete band: values strictly below `below` get `color`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub below: f32,
    pub color: Color,
}

/// Anchor colors of a continuous ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampAnchors {
    Two(Color, Color),
    /// Low, middle and high; the middle color sits at the center of the range.
    Three(Color, Color, Color),
}

impl RampAnchors {
    fn at(&self, t: f32) -> Color {
        match *self {
            RampAnchors::Two(low, high) => interpolate_color(low, high, t),
            RampAnchors::Three(low, mid, high) => {
                if t <= 0.5 {
                    interpolate_color(low, mid, t * 2.0)
                } else {
                    interpolate_color(mid, high, (t - 0.5) * 2.0)
                }
            }
        }
    }
}

/// Where a ramp takes its value range from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSource {
    /// Minimum and maximum of the slice being drawn.
    Observed,
    /// A configured range, identical for every slice.
    Fixed(ValueRange),
}

/// Color scheme for one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorScheme {
    /// Discrete bands checked in ascending order; values not below any
    /// band bound get `above`.
    Threshold {
        bands: Vec<ThresholdBand>,
        above: Color,
    },
    /// Continuous ramp over a value range.
    Ramp {
        anchors: RampAnchors,
        range: RangeSource,
    },
}

impl ColorScheme {
    /// Three bands: below 0.3 blue, below 0.6 green, otherwise red.
    pub fn suitability_bands() -> Self {
        ColorScheme::Threshold {
            bands: vec![
                ThresholdBand {
                    below: 0.3,
                    color: Color::rgb(0, 0, 200),
                },
                ThresholdBand {
                    below: 0.6,
                    color: Color::rgb(0, 200, 0),
                },
            ],
            above: Color::rgb(200, 0, 0),
        }
    }

    pub fn two_color_ramp(low: Color, high: Color, range: RangeSource) -> Self {
        ColorScheme::Ramp {
            anchors: RampAnchors::Two(low, high),
            range,
        }
    }

    fn color_for(&self, value: f32, range: Option<ValueRange>) -> Color {
        match self {
            ColorScheme::Threshold { bands, above } => bands
                .iter()
                .find(|band| value < band.below)
                .map(|band| band.color)
                .unwrap_or(*above),
            ColorScheme::Ramp { anchors, range: source } => {
                let range = range.unwrap_or(match source {
                    RangeSource::Fixed(fixed) => *fixed,
                    RangeSource::Observed => ValueRange::UNIT,
                });
                anchors.at(range.normalize(value))
            }
        }
    }
}

/// Pure mapping from a cell value to a color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapper {
    pub scheme: ColorScheme,
    pub missing: MissingValue,
}

impl ColorMapper {
    pub fn new(scheme: ColorScheme) -> Self {
        Self {
            scheme,
            missing: MissingValue::default(),
        }
    }

    pub fn with_fill_value(mut self, fill_value: Option<f32>) -> Self {
        self.missing.fill_value = fill_value;
        self
    }

    /// Color of one cell.
    ///
    /// `range` is only consulted by ramps; when it is `None` a ramp uses its
    /// fixed range, or [0, 1] if it expects an observed range.
    pub fn to_color(&self, value: f32, range: Option<ValueRange>) -> Color {
        if self.missing.is_missing(value) {
            return Color::transparent();
        }
        self.scheme.color_for(value, range)
    }

    /// Range to pass to [`to_color`](Self::to_color) for the given cells.
    pub fn range_for(&self, values: &[f32]) -> Option<ValueRange> {
        match &self.scheme {
            ColorScheme::Threshold { .. } => None,
            ColorScheme::Ramp {
                range: RangeSource::Fixed(fixed),
                ..
            } => Some(*fixed),
            ColorScheme::Ramp {
                range: RangeSource::Observed,
                ..
            } => ValueRange::observed(values, |v| self.missing.is_missing(v)),
        }
    }
}
