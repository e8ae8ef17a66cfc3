//! Simulation configuration with documented constants
//!
//! Timing and geometry values shared by the item framework, the tower
//! container and the run loop drivers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Seconds;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === CONSTRUCTION ===
    /// Simulated seconds needed to take an item from 0.0 to 1.0 progress
    pub construction_duration: Seconds,

    /// Seconds between reshuffles of the construction worker sprites
    ///
    /// Purely cosmetic. The timer keeps running after construction ends.
    pub worker_frame_interval: Seconds,

    // === GEOMETRY ===
    /// Width of one grid cell in world units
    pub cell_width: f64,

    /// Height of one floor in world units
    pub floor_height: f64,

    /// Lowest buildable floor (basements are negative)
    pub min_floor: i32,

    /// Highest buildable floor
    pub max_floor: i32,

    // === TIMING ===
    /// Step handed to `advance` by the simulation driver every iteration
    ///
    /// A fixed step keeps replays deterministic regardless of wall clock.
    pub fixed_timestep: Seconds,

    /// Driver ticks between two `on_date_advance` notifications
    pub ticks_per_day: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            construction_duration: 2.0,
            worker_frame_interval: 0.1,

            cell_width: 8.0,
            floor_height: 36.0,
            min_floor: -10,
            max_floor: 100,

            fixed_timestep: 1.0 / 60.0,
            ticks_per_day: 600,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, filling missing keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.construction_duration <= 0.0 {
            return Err(format!(
                "construction_duration ({}) must be positive",
                self.construction_duration
            ));
        }

        if self.worker_frame_interval <= 0.0 || self.fixed_timestep <= 0.0 {
            return Err("Timer intervals must be positive".into());
        }

        if self.cell_width <= 0.0 || self.floor_height <= 0.0 {
            return Err("Cell width and floor height must be positive".into());
        }

        // Floor 0 is the ground floor and must always be buildable
        if self.min_floor > 0 || self.max_floor < 0 {
            return Err(format!(
                "floor range [{}, {}] must contain the ground floor",
                self.min_floor, self.max_floor
            ));
        }

        if self.ticks_per_day == 0 {
            return Err("ticks_per_day must be at least 1".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<SimulationConfig> = OnceLock::new();

/// Get the global simulation config (initializes with defaults if not set)
pub fn config() -> &'static SimulationConfig {
    CONFIG.get_or_init(SimulationConfig::default)
}

/// Set the global simulation config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: SimulationConfig) -> Result<(), SimulationConfig> {
    CONFIG.set(config)
}
