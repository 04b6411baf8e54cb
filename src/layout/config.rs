//! Configuration for the layout engine

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::expression::DEFAULT_EPSILON;
use super::strength::Strength;

/// Errors that can occur when loading a layout configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration options for layout computation
///
/// ```toml
/// default_strength = "required"
/// preserve_strength = "weak"
/// non_negative_sizes = true
/// epsilon = 1e-8
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Strength given to strength-model relations declared without one
    pub default_strength: Strength,

    /// Strength with which current geometry is suggested to the solver
    pub preserve_strength: Strength,

    /// Require every solved width and height to be non-negative
    pub non_negative_sizes: bool,

    /// Coefficients within this distance of zero are dropped on reduction
    pub epsilon: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_strength: Strength::REQUIRED,
            preserve_strength: Strength::WEAK,
            non_negative_sizes: true,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_default_strength(mut self, strength: Strength) -> Self {
        self.default_strength = strength;
        self
    }

    pub fn with_preserve_strength(mut self, strength: Strength) -> Self {
        self.preserve_strength = strength;
        self
    }

    pub fn with_non_negative_sizes(mut self, enabled: bool) -> Self {
        self.non_negative_sizes = enabled;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}
