//! Plinko Board - TV-style Plinko board simulation
//!
//! Core modules:
//! - `sim`: Board geometry, token drops, bin resolution and the engine context
//! - `prizes`: Prize bins, landing records and the external store interface
//! - `stats`: Per-bin landing statistics
//! - `settings`: Data-driven engine configuration
//! - `colors`: Per-bin display colors

pub mod colors;
pub mod error;
pub mod prizes;
pub mod settings;
pub mod sim;
pub mod stats;

pub use error::ConfigError;
pub use prizes::{GameStore, LandingRecord, MemoryStore, PrizeBin, PrizeTier};
pub use settings::{ChaosPreset, Settings};
pub use stats::BinStatistics;

/// Board and simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the host render loop)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Canvas dimensions
    pub const WIDTH: f32 = 760.0;
    pub const HEIGHT: f32 = 570.0;

    /// Play-field padding inside the canvas
    pub const PADDING_X: f32 = 52.0;
    pub const PADDING_TOP: f32 = 36.0;
    pub const PADDING_BOTTOM: f32 = 28.0;

    /// Width of the play field between the horizontal paddings
    pub const GAME_WIDTH: f32 = WIDTH - PADDING_X * 2.0;

    /// Fixed number of peg rows for the TV-style board
    pub const ROW_COUNT: usize = 12;

    /// Side wall thickness
    pub const WALL_THICKNESS: f32 = 20.0;
    /// Gap between the play-field edge and a side wall
    pub const WALL_OFFSET: f32 = 10.0;
    /// Bottom sensor thickness
    pub const SENSOR_THICKNESS: f32 = 30.0;
    /// Drop slot marker height
    pub const MARKER_HEIGHT: f32 = 8.0;
    /// Drop slot marker width as a fraction of the slot width
    pub const MARKER_WIDTH_FRACTION: f32 = 0.8;

    /// Default gravity (pixels/s², +y points down)
    pub const GRAVITY: f32 = 900.0;

    /// Interval of the fallback sweep for tokens that slipped past the sensor
    pub const SWEEP_INTERVAL_SECS: f32 = 0.1;

    /// Collision categories
    pub const PEG_CATEGORY: u32 = 0x0001;
    pub const TOKEN_CATEGORY: u32 = 0x0002;
    pub const WALL_CATEGORY: u32 = 0x0004;
    pub const SENSOR_CATEGORY: u32 = 0x0008;
    pub const MARKER_CATEGORY: u32 = 0x0010;
}
