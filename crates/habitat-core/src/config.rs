//! Configuration System
//!
//! Loads tuning parameters from tuning.toml for easy adjustment without
//! recompiling. Every section and field is optional; anything missing falls
//! back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::components::field::{field_constants, Distribution, ResourceField};

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub interaction: InteractionConfig,
    pub links: LinksConfig,
    pub small_world: SmallWorldSection,
    pub foraging: ForagingConfig,
    pub fields: Vec<FieldConfig>,
}

/// Run length, population and world bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub ticks: u64,
    /// Seconds of world time per tick
    pub dt: f32,
    pub agent_count: usize,
    pub world_width: f32,
    pub world_height: f32,
    /// Ticks between progress reports; 0 disables them
    pub report_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 1000,
            dt: 0.1,
            agent_count: 100,
            world_width: 500.0,
            world_height: 500.0,
            report_interval: 100,
        }
    }
}

/// Proximity contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub radius: f32,
    pub initial_strength: f32,
    pub reinforce_amount: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            radius: 25.0,
            initial_strength: 0.5,
            reinforce_amount: 0.02,
        }
    }
}

/// Link decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Strength lost per second
    pub decay_rate: f32,
    pub min_strength: f32,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.01,
            min_strength: 0.05,
        }
    }
}

/// Initial topology and periodic rewiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmallWorldSection {
    pub k: usize,
    pub p: f64,
    pub bidirectional: bool,
    /// Ticks between rewiring passes; 0 disables rewiring
    pub rewire_interval: u64,
    pub rewire_percentage: f64,
}

impl Default for SmallWorldSection {
    fn default() -> Self {
        Self {
            k: 4,
            p: 0.1,
            bidirectional: true,
            rewire_interval: 100,
            rewire_percentage: 0.1,
        }
    }
}

/// What every spawned agent draws from the fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForagingConfig {
    pub demand_per_second: f32,
    /// Only forage this resource type; unset means any
    pub resource_type: Option<String>,
}

impl Default for ForagingConfig {
    fn default() -> Self {
        Self {
            demand_per_second: 0.002,
            resource_type: None,
        }
    }
}

fn default_max_intensity() -> f32 {
    field_constants::DEFAULT_MAX_INTENSITY
}

/// A `[[fields]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub id: String,
    pub resource_type: String,
    pub distribution: Distribution,
    /// Starting intensity; defaults to the cap
    #[serde(default)]
    pub intensity: Option<f32>,
    #[serde(default = "default_max_intensity")]
    pub max_intensity: f32,
    #[serde(default)]
    pub depletion_rate: f32,
    #[serde(default)]
    pub regeneration_rate: f32,
}

impl FieldConfig {
    /// Build the field this entry describes. Validation happens at
    /// registration.
    pub fn to_field(&self) -> ResourceField {
        let field = ResourceField::new(&self.id, &self.resource_type, self.distribution.clone())
            .with_max_intensity(self.max_intensity)
            .with_rates(self.depletion_rate, self.regeneration_rate);
        let intensity = self.intensity.unwrap_or(self.max_intensity);
        field.with_intensity(intensity)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
