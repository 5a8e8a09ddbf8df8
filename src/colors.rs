//! Per-bin display colors
//!
//! Bins fade from red at the edges to yellow in the middle, so the jackpot
//! bin of the default table sits on the brightest color.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::ColumnCount;

const RED_BACKGROUND: Vec3 = Vec3::new(255.0, 0.0, 63.0);
const YELLOW_BACKGROUND: Vec3 = Vec3::new(255.0, 192.0, 0.0);
const RED_SHADOW: Vec3 = Vec3::new(166.0, 0.0, 4.0);
const YELLOW_SHADOW: Vec3 = Vec3::new(171.0, 121.0, 0.0);

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn from_vec3(v: Vec3) -> Self {
        let v = v.round().clamp(Vec3::ZERO, Vec3::splat(255.0));
        Self(v.x as u8, v.y as u8, v.z as u8)
    }

    /// CSS `rgb(r, g, b)` form
    pub fn to_css(&self) -> String {
        format!("rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Background and shadow color of every bin, leftmost first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinColors {
    pub background: Vec<Rgb>,
    pub shadow: Vec<Rgb>,
}

pub fn bin_colors(columns: ColumnCount) -> BinColors {
    let n = columns.get();
    let center = (n - 1) as f32 / 2.0;

    let (background, shadow) = (0..n)
        .map(|bin| {
            // 0 at the edges, 1 at the center
            let t = 1.0 - (bin as f32 - center).abs() / center;
            (
                Rgb::from_vec3(RED_BACKGROUND.lerp(YELLOW_BACKGROUND, t)),
                Rgb::from_vec3(RED_SHADOW.lerp(YELLOW_SHADOW, t)),
            )
        })
        .unzip();

    BinColors { background, shadow }
}
