//! Board geometry
//!
//! Everything about the layout is a pure function of the column count and the
//! fixed paddings in [`crate::consts`]: peg lattice, side walls, drop slots,
//! bin boundaries and the bottom sensor band.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{Body, BodyHandle, CollisionFilter, Material, PhysicsWorld};
use crate::consts::*;
use crate::error::ConfigError;

/// Supported board widths. The set is closed: the peg radius formula is only
/// meaningful for these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ColumnCount {
    Seven,
    #[default]
    Nine,
    Eleven,
}

impl ColumnCount {
    pub const ALL: [ColumnCount; 3] = [ColumnCount::Seven, ColumnCount::Nine, ColumnCount::Eleven];

    /// Number of columns (and bins)
    #[inline]
    pub fn get(self) -> usize {
        match self {
            ColumnCount::Seven => 7,
            ColumnCount::Nine => 9,
            ColumnCount::Eleven => 11,
        }
    }

    /// Peg radius: `min(8, (24 - columns) / 2)`, shrinking as the board widens
    pub fn peg_radius(self) -> f32 {
        (8.0f32).min((24 - self.get()) as f32 / 2.0)
    }

    /// Tokens are twice the size of a peg
    pub fn token_radius(self) -> f32 {
        self.peg_radius() * 2.0
    }

    /// Air friction of the fixed token material profile
    pub fn token_air_friction(self) -> f32 {
        match self {
            ColumnCount::Seven => 0.041,
            ColumnCount::Nine => 0.0395,
            ColumnCount::Eleven => 0.038,
        }
    }
}

impl TryFrom<u32> for ColumnCount {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(ColumnCount::Seven),
            9 => Ok(ColumnCount::Nine),
            11 => Ok(ColumnCount::Eleven),
            other => Err(ConfigError::UnsupportedColumnCount(other)),
        }
    }
}

impl From<ColumnCount> for u32 {
    fn from(value: ColumnCount) -> Self {
        value.get() as u32
    }
}

impl fmt::Display for ColumnCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A single peg in the staggered lattice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peg {
    pub row: usize,
    pub col: usize,
    pub pos: Vec2,
    pub radius: f32,
}

/// Static axis-aligned box (walls, markers, sensor band)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub center: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            size: Vec2::new(width, height),
        }
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.size.x / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.size.x / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.size.y / 2.0
    }
}

/// Complete layout for one column count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardLayout {
    pub columns: ColumnCount,
    pub pegs: Vec<Peg>,
    /// Left and right walls
    pub walls: [Rect; 2],
    /// Drop slot markers, left to right
    pub markers: Vec<Rect>,
    /// `columns + 1` strictly increasing x-coordinates
    pub bin_boundaries: Vec<f32>,
    /// Drop slot x-centers, left to right
    pub drop_slots: Vec<f32>,
    /// Sensor band below the last peg row
    pub sensor: Rect,
    /// Tokens whose center passes this y are swept into a bin
    pub fallback_y: f32,
}

impl BoardLayout {
    /// Generate the layout for a column count
    pub fn generate(columns: ColumnCount) -> Self {
        let n = columns.get();
        let slot_width = slot_width(columns);

        let drop_slots: Vec<f32> = (0..n)
            .map(|slot| PADDING_X + slot_width * slot as f32 + slot_width / 2.0)
            .collect();

        let markers = drop_slots
            .iter()
            .map(|&x| {
                Rect::new(
                    Vec2::new(x, PADDING_TOP / 2.0),
                    slot_width * MARKER_WIDTH_FRACTION,
                    MARKER_HEIGHT,
                )
            })
            .collect();

        let mut bin_boundaries: Vec<f32> = (0..=n).map(|i| PADDING_X + slot_width * i as f32).collect();
        // Pin the last edge exactly to the play-field edge
        bin_boundaries[n] = PADDING_X + GAME_WIDTH;

        // Walls stand inside the play field so the first odd-row peg closes
        // the channel along each wall. They reach well above the top so a
        // high bounce cannot hop over them.
        let wall_height = HEIGHT * 2.0;
        let wall_inset = WALL_OFFSET + WALL_THICKNESS / 2.0;
        let walls = [
            Rect::new(Vec2::new(PADDING_X + wall_inset, 0.0), WALL_THICKNESS, wall_height),
            Rect::new(
                Vec2::new(PADDING_X + GAME_WIDTH - wall_inset, 0.0),
                WALL_THICKNESS,
                wall_height,
            ),
        ];

        let sensor = Rect::new(
            Vec2::new(WIDTH / 2.0, HEIGHT + SENSOR_THICKNESS / 2.0),
            GAME_WIDTH,
            SENSOR_THICKNESS,
        );

        Self {
            columns,
            pegs: generate_pegs(columns),
            walls,
            markers,
            bin_boundaries,
            drop_slots,
            sensor,
            fallback_y: HEIGHT - PADDING_BOTTOM / 2.0,
        }
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.get()
    }

    pub fn peg_radius(&self) -> f32 {
        self.columns.peg_radius()
    }

    pub fn token_radius(&self) -> f32 {
        self.columns.token_radius()
    }

    /// Horizontal range a token center can reach between the walls
    pub fn token_x_range(&self) -> (f32, f32) {
        let r = self.token_radius();
        (self.walls[0].right() + r, self.walls[1].left() - r)
    }

    /// Width of one drop slot (equal to one bin)
    pub fn slot_width(&self) -> f32 {
        slot_width(self.columns)
    }

    /// Bin a token at `x` lands in; positions outside the play field clamp
    /// to the nearest edge bin
    pub fn calculate_bin_index(&self, x: f32) -> usize {
        let relative = x - PADDING_X;
        let index = (relative / self.slot_width()).floor();
        let last = self.column_count() - 1;
        if index.is_nan() || index < 0.0 {
            0
        } else {
            (index as usize).min(last)
        }
    }

    pub fn bin_center(&self, bin: usize) -> Option<f32> {
        let left = *self.bin_boundaries.get(bin)?;
        let right = *self.bin_boundaries.get(bin + 1)?;
        Some((left + right) / 2.0)
    }

    /// Horizontal span `[left, right)` of a drop slot
    pub fn slot_span(&self, slot: usize) -> Option<(f32, f32)> {
        Some((*self.bin_boundaries.get(slot)?, *self.bin_boundaries.get(slot + 1)?))
    }

    /// Bodies one rebuild adds: markers, pegs and two walls
    pub fn body_count(&self) -> usize {
        self.markers.len() + self.pegs.len() + self.walls.len()
    }

    /// Add this layout's bodies to a world, in marker, peg, wall order
    pub fn spawn_bodies<W: PhysicsWorld>(&self, world: &mut W) -> Vec<BodyHandle> {
        let mut handles = Vec::with_capacity(self.body_count());

        for marker in &self.markers {
            let body = Body::rect(marker.center, marker.size.x, marker.size.y)
                .fixed()
                .sensor()
                .with_filter(CollisionFilter::new(MARKER_CATEGORY, 0));
            handles.push(world.add_body(body));
        }

        for peg in &self.pegs {
            let body = Body::circle(peg.pos, peg.radius)
                .fixed()
                .with_filter(CollisionFilter::new(PEG_CATEGORY, TOKEN_CATEGORY))
                .with_material(Material {
                    restitution: 0.5,
                    friction: 0.1,
                    air_friction: 0.0,
                });
            handles.push(world.add_body(body));
        }

        for wall in &self.walls {
            let body = Body::rect(wall.center, wall.size.x, wall.size.y)
                .fixed()
                .with_filter(CollisionFilter::new(WALL_CATEGORY, TOKEN_CATEGORY))
                .with_material(Material {
                    restitution: 0.8,
                    friction: 0.1,
                    air_friction: 0.0,
                });
            handles.push(world.add_body(body));
        }

        handles
    }

    /// Static sensor body spanning the bottom of the play field
    pub fn sensor_body(&self) -> Body {
        Body::rect(self.sensor.center, self.sensor.size.x, self.sensor.size.y)
            .fixed()
            .sensor()
            .with_filter(CollisionFilter::new(SENSOR_CATEGORY, TOKEN_CATEGORY))
    }
}

#[inline]
fn slot_width(columns: ColumnCount) -> f32 {
    GAME_WIDTH / columns.get() as f32
}

/// Horizontal distance between peg centers
pub fn peg_spacing_x(columns: ColumnCount) -> f32 {
    GAME_WIDTH / (columns.get() - 1) as f32
}

/// Vertical distance between peg rows
pub fn peg_spacing_y() -> f32 {
    (HEIGHT - PADDING_TOP - PADDING_BOTTOM) / (ROW_COUNT - 1) as f32
}

/// Staggered lattice: even rows sit on the column lines, odd rows are offset
/// by half a spacing with one fewer peg. Pegs within one radius of either
/// play-field edge are skipped.
fn generate_pegs(columns: ColumnCount) -> Vec<Peg> {
    let n = columns.get();
    let radius = columns.peg_radius();
    let dx = peg_spacing_x(columns);
    let dy = peg_spacing_y();
    let min_x = PADDING_X + radius;
    let max_x = WIDTH - PADDING_X - radius;

    let mut pegs = Vec::new();
    for row in 0..ROW_COUNT {
        let y = PADDING_TOP + dy * row as f32;
        let (count, offset) = if row % 2 == 0 { (n, 0.0) } else { (n - 1, dx / 2.0) };
        for col in 0..count {
            let x = PADDING_X + dx * col as f32 + offset;
            if x < min_x || x > max_x {
                continue;
            }
            pegs.push(Peg {
                row,
                col,
                pos: Vec2::new(x, y),
                radius,
            });
        }
    }
    pegs
}

/// Peg count predicted by the lattice formula: even rows lose both edge
/// pegs, odd rows keep all `columns - 1`
pub fn expected_peg_count(columns: ColumnCount) -> usize {
    let n = columns.get();
    let even_rows = ROW_COUNT.div_ceil(2);
    let odd_rows = ROW_COUNT / 2;
    even_rows * (n - 2) + odd_rows * (n - 1)
}
