//! Landing statistics
//!
//! Counts are always derived from the landing log, never stored. Records
//! from a different board width are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::prizes::LandingRecord;
use crate::sim::ColumnCount;

/// Landings per bin for one column count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinStatistics {
    pub column_count: ColumnCount,
    /// Every bin of the board, zero if nothing landed there
    pub counts: BTreeMap<usize, u32>,
}

impl BinStatistics {
    pub fn from_records(records: &[LandingRecord], columns: ColumnCount) -> Self {
        let mut counts: BTreeMap<usize, u32> = (0..columns.get()).map(|bin| (bin, 0)).collect();
        for record in records {
            if record.column_count != columns {
                continue;
            }
            if let Some(count) = counts.get_mut(&record.bin_index) {
                *count += 1;
            }
        }
        Self {
            column_count: columns,
            counts,
        }
    }

    pub fn count(&self, bin: usize) -> u32 {
        self.counts.get(&bin).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Fraction of landings in `bin` (0 with no landings)
    pub fn share(&self, bin: usize) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.count(bin) as f32 / total as f32,
        }
    }

    /// Bin with the most landings, leftmost on ties; `None` with no landings
    pub fn most_hit(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (&bin, &count) in &self.counts {
            if count > 0 && best.is_none_or(|(_, c)| count > c) {
                best = Some((bin, count));
            }
        }
        best.map(|(bin, _)| bin)
    }
}
