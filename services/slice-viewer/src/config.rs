//! Viewer configuration loader.
//!
//! Loads the YAML file describing partitions, coordinate names, selectable
//! variables with their color schemes, and overlay options.
//!
//! Supports environment variable substitution using ${VAR} and
//! ${VAR:-default} syntax.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

use dataset::DatasetConfig;
use renderer::style::{BandConfig, RangeConfig};
use renderer::{ColorMapper, ColorSchemeConfig, StyleError};
use slice_common::SliceRequest;

/// Environment variable overriding the overlay opacity.
pub const OPACITY_ENV: &str = "SLICE_OVERLAY_OPACITY";

/// Environment variable holding a base URL or directory for relative
/// partition sources.
pub const BASE_URL_ENV: &str = "SLICE_DATA_BASE_URL";

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(flatten)]
    pub dataset: DatasetConfig,

    /// Selectable variables, in selector order.
    #[serde(default = "default_variables")]
    pub variables: Vec<VariableConfig>,

    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,

    /// Fill value marking missing cells. Overrides the one declared by the
    /// dataset.
    #[serde(default)]
    pub fill_value: Option<f32>,

    pub color_scheme: ColorSchemeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    0.85
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
        }
    }
}

fn default_variables() -> Vec<VariableConfig> {
    vec![
        VariableConfig {
            name: "suitability_index".to_string(),
            fill_value: None,
            color_scheme: ColorSchemeConfig::Threshold {
                bands: vec![
                    BandConfig {
                        below: 0.3,
                        color: "#0000C8".to_string(),
                    },
                    BandConfig {
                        below: 0.6,
                        color: "#00C800".to_string(),
                    },
                ],
                above: "#C80000".to_string(),
            },
        },
        VariableConfig {
            name: "suitability_class".to_string(),
            fill_value: None,
            color_scheme: ColorSchemeConfig::Ramp {
                colors: vec!["#FFFFCC".to_string(), "#006837".to_string()],
                range: RangeConfig::default(),
            },
        },
    ]
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            variables: default_variables(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl VariableConfig {
    /// Build the color mapper for this variable.
    pub fn mapper(&self) -> Result<ColorMapper, StyleError> {
        let scheme = self.color_scheme.build()?;
        Ok(ColorMapper::new(scheme).with_fill_value(self.fill_value))
    }
}

impl ViewerConfig {
    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(OPACITY_ENV) {
            match raw.trim().parse::<f32>() {
                Ok(opacity) => self.overlay.opacity = opacity,
                Err(_) => warn!(value = %raw, "Ignoring unparsable {}", OPACITY_ENV),
            }
        }
        if let Some(base) = lookup(BASE_URL_ENV) {
            if !base.is_empty() {
                self.dataset.rebase_sources(&base);
            }
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableConfig> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Selection shown before the user picks anything: the first variable,
    /// the first covered year and January.
    pub fn initial_request(&self) -> Option<SliceRequest> {
        let variable = self.variables.first()?;
        let (first_year, _) = self.dataset.partition_index().coverage()?;
        Some(SliceRequest::new(variable.name.clone(), first_year, 1))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.dataset
            .validate()
            .context("Invalid dataset configuration")?;

        if let Err(gap) = self.dataset.partition_index().check_contiguous() {
            warn!(detail = %gap, "Partitions are not contiguous; first match wins");
        }

        anyhow::ensure!(
            !self.variables.is_empty(),
            "At least one variable must be configured"
        );

        let mut seen = HashSet::new();
        for variable in &self.variables {
            anyhow::ensure!(!variable.name.trim().is_empty(), "Variable name cannot be empty");
            anyhow::ensure!(
                seen.insert(variable.name.as_str()),
                "Duplicate variable: {}",
                variable.name
            );
            variable
                .color_scheme
                .build()
                .with_context(|| format!("Invalid color scheme for variable {}", variable.name))?;
        }

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.overlay.opacity),
            "Overlay opacity must be within [0, 1], got {}",
            self.overlay.opacity
        );

        Ok(())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load, expand, override and validate a viewer configuration file.
pub fn load_viewer_config<P: AsRef<Path>>(path: P) -> Result<ViewerConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read viewer config from {:?}", path.as_ref()))?;

    let mut config = parse_viewer_config(&content)?;
    config.apply_env();
    config.validate()?;

    Ok(config)
}

/// Parse YAML content after environment variable expansion.
pub fn parse_viewer_config(content: &str) -> Result<ViewerConfig> {
    let expanded = expand_env_vars(content)?;
    serde_yaml::from_str(&expanded).with_context(|| "Failed to parse viewer config YAML")
}

/// Built-in configuration with environment overrides applied.
pub fn default_viewer_config() -> Result<ViewerConfig> {
    let mut config = ViewerConfig::default();
    config.apply_env();
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::ColorScheme;
    use std::collections::HashMap;

    const SAMPLE: &str = r##"
partitions:
  - { start: 1950, end: 1968, source: "${SLICE_TEST_DATA_DIR:-/data}/part1.json" }
  - { start: 1969, end: 1987, source: part2.json }
axes:
  time: time
variables:
  - name: suitability_index
    fill_value: -9999.0
    color_scheme:
      type: threshold
      bands:
        - { below: 0.3, color: "#0000C8" }
        - { below: 0.6, color: "#00C800" }
      above: "#C80000"
  - name: yield_anomaly
    color_scheme:
      type: ramp
      colors: ["#2166AC", "#F7F7F7", "#B2182B"]
      range: { min: -2.0, max: 2.0 }
overlay:
  opacity: 0.7
"##;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("SLICE_TEST_EXPAND", "test_value");
        let result = expand_env_vars("prefix_${SLICE_TEST_EXPAND}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("SLICE_TEST_NONEXISTENT");
        let result = expand_env_vars("value_${SLICE_TEST_NONEXISTENT:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("SLICE_TEST_REQUIRED");
        assert!(expand_env_vars("${SLICE_TEST_REQUIRED}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_parse_sample() {
        std::env::remove_var("SLICE_TEST_DATA_DIR");
        let config = parse_viewer_config(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.dataset.partitions[0].source_id, "/data/part1.json");
        assert_eq!(config.dataset.axes.time, "time");
        assert_eq!(config.dataset.axes.latitude, "latitude");
        assert_eq!(config.variable_names(), vec!["suitability_index", "yield_anomaly"]);
        assert_eq!(config.overlay.opacity, 0.7);

        let mapper = config.variable("suitability_index").unwrap().mapper().unwrap();
        assert_eq!(mapper.scheme, ColorScheme::suitability_bands());
        assert_eq!(mapper.missing.fill_value, Some(-9999.0));
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        std::env::remove_var("SLICE_DATA_DIR");
        let bundled = include_str!("../config/viewer.yaml");
        let config = parse_viewer_config(bundled).unwrap();
        config.validate().unwrap();

        let defaults = ViewerConfig::default();
        assert_eq!(config.dataset.partition_index().years(), defaults.dataset.partition_index().years());
        assert_eq!(config.dataset.partitions[3].source_id, "data/arabica_suitability_part4.json");
        assert_eq!(config.variable_names(), defaults.variable_names());
        assert_eq!(config.variables[0].color_scheme, defaults.variables[0].color_scheme);
        assert_eq!(config.variable("suitability_class").unwrap().fill_value, Some(-9999.0));
        assert_eq!(config.overlay, defaults.overlay);
    }

    #[test]
    fn test_defaults_when_sections_omitted() {
        let config = parse_viewer_config("partitions:\n  - { start: 2000, end: 2001, source: a.json }\n").unwrap();
        assert_eq!(config.overlay.opacity, 0.85);
        assert_eq!(config.variable_names(), vec!["suitability_index", "suitability_class"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dataset.partitions.len(), 4);
        assert_eq!(
            config.initial_request(),
            Some(SliceRequest::new("suitability_index", 1950, 1))
        );
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (OPACITY_ENV, "0.5"),
            (BASE_URL_ENV, "https://data.example.org/suitability"),
        ]
        .into_iter()
        .collect();

        let mut config = ViewerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.overlay.opacity, 0.5);
        assert_eq!(
            config.dataset.partitions[0].source_id,
            "https://data.example.org/suitability/arabica_suitability_part1.json"
        );
    }

    #[test]
    fn test_unparsable_opacity_is_ignored() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(|key| (key == OPACITY_ENV).then(|| "opaque".to_string()));
        assert_eq!(config.overlay.opacity, 0.85);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ViewerConfig::default();
        config.variables.clear();
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        let duplicate = config.variables[0].clone();
        config.variables.push(duplicate);
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.overlay.opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.variables[1].color_scheme = ColorSchemeConfig::Ramp {
            colors: vec!["#FFFFFF".to_string()],
            range: RangeConfig::default(),
        };
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.dataset.partitions[0].end = 1900;
        assert!(config.validate().is_err());
    }
}
