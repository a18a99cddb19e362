//! Prism generation parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PrismError;

/// How disk generation is scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// One disk at a time on the calling thread; grid engine calls are serialized.
    Sequential,
    /// Segments and disks fan out over the rayon pool.
    #[default]
    Parallel,
}

fn default_velocity_multiplier() -> f64 {
    1.0
}

/// Parameters shared by both prism variants.
///
/// ```toml
/// disk_interval = 30.0
/// cell_size = 10.0
/// velocity_multiplier = 1.25
/// expand_edges_factor = 0.5
/// execution = "sequential"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrismConfig {
    /// Seconds represented by each disk. Must not exceed the trajectory's
    /// shortest segment.
    pub disk_interval: f64,
    /// Raster cell size in map units.
    pub cell_size: f64,
    /// Inflation applied to the observed segment speed (>= 1). Default: 1.
    #[serde(default = "default_velocity_multiplier")]
    pub velocity_multiplier: f64,
    /// Fraction of the trajectory's width/height added on every side of the
    /// analysis extent. Default: 0.
    #[serde(default)]
    pub expand_edges_factor: f64,
    #[serde(default)]
    pub execution: Execution,
}

impl PrismConfig {
    pub fn new(disk_interval: f64, cell_size: f64) -> Self {
        Self {
            disk_interval,
            cell_size,
            velocity_multiplier: default_velocity_multiplier(),
            expand_edges_factor: 0.0,
            execution: Execution::default(),
        }
    }

    pub fn with_velocity_multiplier(mut self, velocity_multiplier: f64) -> Self {
        self.velocity_multiplier = velocity_multiplier;
        self
    }

    pub fn with_expand_edges_factor(mut self, expand_edges_factor: f64) -> Self {
        self.expand_edges_factor = expand_edges_factor;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Check every parameter is finite and in range.
    pub fn validate(&self) -> Result<(), PrismError> {
        let invalid = |msg: String| Err(PrismError::InvalidConfig(msg));
        if !(self.disk_interval.is_finite() && self.disk_interval > 0.0) {
            return invalid(format!(
                "disk_interval must be positive, got {}",
                self.disk_interval
            ));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return invalid(format!("cell_size must be positive, got {}", self.cell_size));
        }
        if !(self.velocity_multiplier.is_finite() && self.velocity_multiplier >= 1.0) {
            return invalid(format!(
                "velocity_multiplier must be at least 1, got {}",
                self.velocity_multiplier
            ));
        }
        if !(self.expand_edges_factor.is_finite() && self.expand_edges_factor >= 0.0) {
            return invalid(format!(
                "expand_edges_factor must be non-negative, got {}",
                self.expand_edges_factor
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, PrismError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrismError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, PrismError> {
        Ok(toml::to_string(self)?)
    }
}
