//! Prize bins, landing records and the store they live in
//!
//! The engine only reads prize configuration and appends landing records.
//! Whoever hosts the engine owns the store; [`MemoryStore`] is the in-process
//! default and can be saved to and loaded from JSON.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::sim::ColumnCount;

/// Prize tier. Stored as a plain string; names outside the four built-in
/// tiers are kept as [`PrizeTier::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrizeTier {
    #[default]
    Small,
    Medium,
    Large,
    Jackpot,
    Other(String),
}

impl PrizeTier {
    pub fn as_str(&self) -> &str {
        match self {
            PrizeTier::Small => "small",
            PrizeTier::Medium => "medium",
            PrizeTier::Large => "large",
            PrizeTier::Jackpot => "jackpot",
            PrizeTier::Other(name) => name,
        }
    }
}

impl From<String> for PrizeTier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "small" => PrizeTier::Small,
            "medium" => PrizeTier::Medium,
            "large" => PrizeTier::Large,
            "jackpot" => PrizeTier::Jackpot,
            _ => PrizeTier::Other(value),
        }
    }
}

impl From<PrizeTier> for String {
    fn from(value: PrizeTier) -> Self {
        match value {
            PrizeTier::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Configuration of one prize bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeBin {
    pub id: String,
    pub name: String,
    pub tier: PrizeTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PrizeBin {
    pub fn new(id: &str, name: &str, tier: PrizeTier) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tier,
            description: None,
            image_url: None,
        }
    }

    /// Stand-in when a bin index has no configured prize
    pub fn unknown() -> Self {
        Self::new("unknown", "Unknown Prize", PrizeTier::Small)
    }

    pub fn is_unknown(&self) -> bool {
        self.id == "unknown"
    }
}

/// Default prize table, wide enough for the largest board
pub fn default_prize_bins() -> Vec<PrizeBin> {
    vec![
        PrizeBin::new("small-1", "Sticker", PrizeTier::Small),
        PrizeBin::new("small-2", "Candy", PrizeTier::Small),
        PrizeBin::new("medium-1", "Toy Car", PrizeTier::Medium),
        PrizeBin::new("large-1", "Stuffed Animal", PrizeTier::Large),
        PrizeBin::new("jackpot", "JACKPOT!", PrizeTier::Jackpot),
        PrizeBin::new("large-2", "Puzzle", PrizeTier::Large),
        PrizeBin::new("medium-2", "Bouncy Ball", PrizeTier::Medium),
        PrizeBin::new("small-3", "Eraser", PrizeTier::Small),
        PrizeBin::new("small-4", "Pencil", PrizeTier::Small),
        PrizeBin::new("small-5", "Balloon", PrizeTier::Small),
        PrizeBin::new("small-6", "Bookmark", PrizeTier::Small),
    ]
}

/// Immutable outcome of one token landing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Zero-based bin, leftmost is 0
    pub bin_index: usize,
    /// Copy of the prize configuration at landing time
    pub prize: PrizeBin,
    /// Board width when the token landed
    pub column_count: ColumnCount,
    /// Token x at resolution
    #[serde(default)]
    pub landing_x: f32,
}

/// External state the engine reads prizes from and writes landings to
pub trait GameStore {
    /// Prize configuration indexed by bin
    fn prize_bins(&self) -> &[PrizeBin];

    /// Landing log, oldest first
    fn records(&self) -> &[LandingRecord];

    /// Append a landing. Existing records are never modified.
    fn append_record(&mut self, record: LandingRecord);
}

/// In-memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStore {
    prize_bins: Vec<PrizeBin>,
    #[serde(default)]
    records: Vec<LandingRecord>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(default_prize_bins())
    }
}

impl MemoryStore {
    pub fn new(prize_bins: Vec<PrizeBin>) -> Self {
        Self {
            prize_bins,
            records: Vec::new(),
        }
    }

    /// Replace the prize table (takes effect for the next landing)
    pub fn set_prize_bins(&mut self, prize_bins: Vec<PrizeBin>) {
        self.prize_bins = prize_bins;
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_json(&json)?;
        log::info!(
            "Loaded store from {} ({} prize bins, {} records)",
            path.as_ref().display(),
            store.prize_bins.len(),
            store.records.len()
        );
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Store saved ({} records)", self.records.len());
        Ok(())
    }
}

impl GameStore for MemoryStore {
    fn prize_bins(&self) -> &[PrizeBin] {
        &self.prize_bins
    }

    fn records(&self) -> &[LandingRecord] {
        &self.records
    }

    fn append_record(&mut self, record: LandingRecord) {
        self.records.push(record);
    }
}

/// Fail if the prize table cannot cover every bin of `columns`
pub fn check_prize_table(bins: &[PrizeBin], columns: ColumnCount) -> Result<(), ConfigError> {
    if bins.len() < columns.get() {
        return Err(ConfigError::PrizeTableTooShort {
            needed: columns.get(),
            found: bins.len(),
        });
    }
    Ok(())
}
