//! Configuration errors
//!
//! Only configuration misuse is an error. Runtime paths (drops, ticks,
//! resolution) recover locally and never return one of these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unsupported column count {0} (expected 7, 9 or 11)")]
    UnsupportedColumnCount(u32),

    #[error("prize table has {found} bins but the board needs {needed}")]
    PrizeTableTooShort { needed: usize, found: usize },

    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange { name: &'static str, min: f32, max: f32 },

    #[error("probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("jitter fraction must be within [0, 0.5), got {0}")]
    InvalidJitter(f32),

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("{name} must be finite and non-negative, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
