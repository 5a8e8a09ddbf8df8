//! Engine settings
//!
//! Persisted as JSON next to the store. Everything the engine needs to build
//! a board and reproduce a run lives here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{GRAVITY, SWEEP_INTERVAL_SECS};
use crate::error::ConfigError;
use crate::sim::{ChaosConfig, ColumnCount};

/// Chaos presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChaosPreset {
    /// Fixed materials, ±20% jitter
    #[default]
    Classic,
    /// Randomized materials, ±45% jitter
    Wild,
}

impl ChaosPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaosPreset::Classic => "Classic",
            ChaosPreset::Wild => "Wild",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "classic" => Some(ChaosPreset::Classic),
            "wild" => Some(ChaosPreset::Wild),
            _ => None,
        }
    }

    pub fn config(&self) -> ChaosConfig {
        match self {
            ChaosPreset::Classic => ChaosConfig::classic(),
            ChaosPreset::Wild => ChaosConfig::wild(),
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Board width
    pub column_count: ColumnCount,
    /// RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Downward gravity (px/s²)
    pub gravity: f32,
    /// Fallback sweep interval (seconds)
    pub sweep_interval_secs: f32,
    pub chaos: ChaosConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            column_count: ColumnCount::Nine,
            seed: None,
            gravity: GRAVITY,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
            chaos: ChaosConfig::classic(),
        }
    }
}

impl Settings {
    /// Default settings with a chaos preset applied
    pub fn from_preset(preset: ChaosPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    pub fn apply_preset(&mut self, preset: ChaosPreset) {
        self.chaos = preset.config();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "gravity",
                value: self.gravity,
            });
        }
        if !(self.sweep_interval_secs.is_finite() && self.sweep_interval_secs > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "sweep_interval_secs",
                value: self.sweep_interval_secs,
            });
        }
        self.chaos.validate()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Settings saved");
        Ok(())
    }
}
