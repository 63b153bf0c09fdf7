//! Color scheme configuration as it appears in config files.
//!
//! ```yaml
//! color_scheme:
//!   type: threshold
//!   bands:
//!     - { below: 0.3, color: "#0000C8" }
//!     - { below: 0.6, color: "#00C800" }
//!   above: "#C80000"
//! ```
//!
//! ```yaml
//! color_scheme:
//!   type: ramp
//!   colors: ["#FFFFCC", "#006837"]
//!   range: observed        # or { min: 0.0, max: 4.0 }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gradient::{Color, ColorScheme, RampAnchors, RangeSource, ThresholdBand, ValueRange};

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("invalid color '{0}': expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),

    #[error("threshold scheme needs at least one band")]
    NoBands,

    #[error("threshold bands must be strictly ascending ({previous} then {next})")]
    UnorderedBands { previous: f32, next: f32 },

    #[error("ramp needs 2 or 3 colors, got {0}")]
    RampColorCount(usize),

    #[error("ramp range must satisfy min < max (got {min}..{max})")]
    InvalidRange { min: f32, max: f32 },
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Parse `#RRGGBB` (opaque) or `#RRGGBBAA`.
pub fn parse_color(hex: &str) -> Result<Color, StyleError> {
    let digits = hex.trim_start_matches('#');
    let invalid = || StyleError::InvalidColor(hex.to_string());

    match digits.len() {
        6 => hex_to_rgb(digits)
            .map(|(r, g, b)| Color::rgb(r, g, b))
            .ok_or_else(invalid),
        8 if digits.is_ascii() => {
            let (r, g, b) = hex_to_rgb(&digits[0..6]).ok_or_else(invalid)?;
            let a = u8::from_str_radix(&digits[6..8], 16).map_err(|_| invalid())?;
            Ok(Color::new(r, g, b, a))
        }
        _ => Err(invalid()),
    }
}

/// Serialized form of a [`ColorScheme`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColorSchemeConfig {
    Threshold {
        bands: Vec<BandConfig>,
        above: String,
    },
    Ramp {
        colors: Vec<String>,
        #[serde(default)]
        range: RangeConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BandConfig {
    pub below: f32,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RangeConfig {
    Keyword(RangeKeyword),
    Fixed { min: f32, max: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKeyword {
    Observed,
}

impl Default for RangeConfig {
    fn default() -> Self {
        RangeConfig::Keyword(RangeKeyword::Observed)
    }
}

impl ColorSchemeConfig {
    /// Validate and convert into a scheme usable by [`ColorMapper`](crate::ColorMapper).
    pub fn build(&self) -> Result<ColorScheme, StyleError> {
        match self {
            ColorSchemeConfig::Threshold { bands, above } => {
                if bands.is_empty() {
                    return Err(StyleError::NoBands);
                }
                for pair in bands.windows(2) {
                    if pair[0].below >= pair[1].below {
                        return Err(StyleError::UnorderedBands {
                            previous: pair[0].below,
                            next: pair[1].below,
                        });
                    }
                }
                let bands = bands
                    .iter()
                    .map(|band| {
                        Ok(ThresholdBand {
                            below: band.below,
                            color: parse_color(&band.color)?,
                        })
                    })
                    .collect::<Result<Vec<_>, StyleError>>()?;

                Ok(ColorScheme::Threshold {
                    bands,
                    above: parse_color(above)?,
                })
            }
            ColorSchemeConfig::Ramp { colors, range } => {
                let parsed = colors
                    .iter()
                    .map(|c| parse_color(c))
                    .collect::<Result<Vec<_>, StyleError>>()?;
                let anchors = match parsed.as_slice() {
                    [low, high] => RampAnchors::Two(*low, *high),
                    [low, mid, high] => RampAnchors::Three(*low, *mid, *high),
                    other => return Err(StyleError::RampColorCount(other.len())),
                };
                let range = match *range {
                    RangeConfig::Keyword(RangeKeyword::Observed) => RangeSource::Observed,
                    RangeConfig::Fixed { min, max } => {
                        if min.is_nan() || max.is_nan() || min >= max {
                            return Err(StyleError::InvalidRange { min, max });
                        }
                        RangeSource::Fixed(ValueRange::new(min, max))
                    }
                };
                Ok(ColorScheme::Ramp { anchors, range })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#0000C8"), Some((0, 0, 200)));
        assert_eq!(hex_to_rgb("00c800"), Some((0, 200, 0)));
        assert_eq!(hex_to_rgb("#abc"), None);
        assert_eq!(hex_to_rgb("#zz0000"), None);
    }

    #[test]
    fn test_parse_color_with_alpha() {
        assert_eq!(parse_color("#FF000080").unwrap(), Color::new(255, 0, 0, 128));
        assert!(matches!(parse_color("red"), Err(StyleError::InvalidColor(_))));
    }

    #[test]
    fn test_threshold_config_builds_default_bands() {
        let config = ColorSchemeConfig::Threshold {
            bands: vec![
                BandConfig { below: 0.3, color: "#0000C8".into() },
                BandConfig { below: 0.6, color: "#00C800".into() },
            ],
            above: "#C80000".into(),
        };
        assert_eq!(config.build().unwrap(), ColorScheme::suitability_bands());
    }

    #[test]
    fn test_unordered_bands_rejected() {
        let config = ColorSchemeConfig::Threshold {
            bands: vec![
                BandConfig { below: 0.6, color: "#00C800".into() },
                BandConfig { below: 0.3, color: "#0000C8".into() },
            ],
            above: "#C80000".into(),
        };
        assert!(matches!(config.build(), Err(StyleError::UnorderedBands { .. })));
    }

    #[test]
    fn test_ramp_config_from_json() {
        let json = r##"{"type": "ramp", "colors": ["#FFFFCC", "#006837"]}"##;
        let config: ColorSchemeConfig = serde_json::from_str(json).unwrap();
        match config.build().unwrap() {
            ColorScheme::Ramp { anchors, range } => {
                assert_eq!(anchors, RampAnchors::Two(Color::rgb(255, 255, 204), Color::rgb(0, 104, 55)));
                assert_eq!(range, RangeSource::Observed);
            }
            other => panic!("expected ramp, got {:?}", other),
        }
    }

    #[test]
    fn test_ramp_fixed_range_from_json() {
        let json = r##"{"type": "ramp", "colors": ["#000000", "#808080", "#FFFFFF"], "range": {"min": 0, "max": 4}}"##;
        let config: ColorSchemeConfig = serde_json::from_str(json).unwrap();
        match config.build().unwrap() {
            ColorScheme::Ramp { range, .. } => {
                assert_eq!(range, RangeSource::Fixed(ValueRange::new(0.0, 4.0)));
            }
            other => panic!("expected ramp, got {:?}", other),
        }
    }

    #[test]
    fn test_ramp_validation() {
        let one = ColorSchemeConfig::Ramp {
            colors: vec!["#000000".into()],
            range: RangeConfig::default(),
        };
        assert_eq!(one.build(), Err(StyleError::RampColorCount(1)));

        let inverted = ColorSchemeConfig::Ramp {
            colors: vec!["#000000".into(), "#FFFFFF".into()],
            range: RangeConfig::Fixed { min: 2.0, max: 1.0 },
        };
        assert!(matches!(inverted.build(), Err(StyleError::InvalidRange { .. })));
    }
}
