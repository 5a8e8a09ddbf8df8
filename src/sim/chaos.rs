//! Chaos tuning
//!
//! Every randomized knob of a drop lives here: entry jitter, token material,
//! launch kick, per-peg kicks, the rare "big bounce", and the optional
//! avoid-bin nudge. Sampling always goes through the caller's RNG so a seeded
//! engine replays identically.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::ColumnCount;
use super::physics::Material;
use crate::error::ConfigError;

/// Inclusive `[min, max]` parameter range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Symmetric range `[-magnitude, magnitude]`
    pub const fn symmetric(magnitude: f32) -> Self {
        Self {
            min: -magnitude,
            max: magnitude,
        }
    }

    /// Uniform draw from the range. Empty, reversed or unbounded ranges
    /// yield `min` without touching the RNG.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let span = self.max - self.min;
        if !(span.is_finite() && span > 0.0) {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let span = self.max - self.min;
        if !span.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// How a token's material is chosen per drop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialProfile {
    /// Same restitution/friction every drop, air friction tuned per column count
    Fixed { restitution: f32, friction: f32 },
    /// Every parameter drawn fresh per drop
    Randomized {
        restitution: ParamRange,
        friction: ParamRange,
        air_friction: ParamRange,
    },
}

impl MaterialProfile {
    pub const FIXED: MaterialProfile = MaterialProfile::Fixed {
        restitution: 0.8,
        friction: 0.5,
    };

    pub const RANDOMIZED: MaterialProfile = MaterialProfile::Randomized {
        restitution: ParamRange::new(0.4, 1.25),
        friction: ParamRange::new(0.1, 0.85),
        air_friction: ParamRange::new(0.01, 0.09),
    };

    pub fn sample<R: Rng + ?Sized>(&self, columns: ColumnCount, rng: &mut R) -> Material {
        match *self {
            MaterialProfile::Fixed { restitution, friction } => Material {
                restitution,
                friction,
                air_friction: columns.token_air_friction(),
            },
            MaterialProfile::Randomized {
                restitution,
                friction,
                air_friction,
            } => Material {
                restitution: restitution.sample(rng),
                friction: friction.sample(rng),
                air_friction: air_friction.sample(rng),
            },
        }
    }
}

/// Soft statistical bias away from one bin. Off unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvoidBin {
    /// Bin to steer away from
    pub bin: usize,
    /// Trigger distance from the bin center, as a fraction of bin width
    pub threshold: f32,
    /// Chance of nudging per evaluation
    pub probability: f64,
    /// Lateral velocity change of a nudge (pixels/s)
    pub strength: f32,
}

impl AvoidBin {
    pub fn new(bin: usize) -> Self {
        Self {
            bin,
            threshold: 0.5,
            probability: 0.01,
            strength: 40.0,
        }
    }
}

/// Named home for every randomized drop parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// Spawn jitter as a fraction of slot width (applied ±)
    pub jitter_fraction: f32,
    pub material: MaterialProfile,
    /// Initial kick (pixels/s)
    pub launch_lateral: ParamRange,
    pub launch_vertical: ParamRange,
    /// Initial spin (rad/s)
    pub launch_spin: ParamRange,
    /// Kick on every peg hit (pixels/s)
    pub peg_lateral: ParamRange,
    pub peg_vertical: ParamRange,
    /// Spin added on every peg hit (rad/s)
    pub peg_spin: ParamRange,
    /// Chance that a peg hit becomes a big bounce
    pub big_bounce_chance: f64,
    /// Multiplier on the peg kick for a big bounce
    pub big_bounce_scale: f32,
    #[serde(default)]
    pub avoid_bin: Option<AvoidBin>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl ChaosConfig {
    /// Fixed material, narrow ±20% entry jitter
    pub fn classic() -> Self {
        Self {
            jitter_fraction: 0.2,
            material: MaterialProfile::FIXED,
            launch_lateral: ParamRange::symmetric(40.0),
            launch_vertical: ParamRange::new(0.0, 30.0),
            launch_spin: ParamRange::symmetric(2.0),
            peg_lateral: ParamRange::symmetric(60.0),
            peg_vertical: ParamRange::new(-30.0, 15.0),
            peg_spin: ParamRange::symmetric(2.0),
            big_bounce_chance: 0.1,
            big_bounce_scale: 3.0,
            avoid_bin: None,
        }
    }

    /// Randomized material, wide ±45% entry jitter, harder kicks
    pub fn wild() -> Self {
        Self {
            jitter_fraction: 0.45,
            material: MaterialProfile::RANDOMIZED,
            launch_lateral: ParamRange::symmetric(80.0),
            launch_vertical: ParamRange::new(0.0, 60.0),
            launch_spin: ParamRange::symmetric(6.0),
            peg_lateral: ParamRange::symmetric(90.0),
            peg_vertical: ParamRange::new(-50.0, 20.0),
            peg_spin: ParamRange::symmetric(4.0),
            big_bounce_chance: 0.1,
            big_bounce_scale: 3.5,
            avoid_bin: None,
        }
    }

    /// No randomness at all beyond slot choice (useful for tests)
    pub fn still() -> Self {
        Self {
            jitter_fraction: 0.0,
            material: MaterialProfile::FIXED,
            launch_lateral: ParamRange::new(0.0, 0.0),
            launch_vertical: ParamRange::new(0.0, 0.0),
            launch_spin: ParamRange::new(0.0, 0.0),
            peg_lateral: ParamRange::new(0.0, 0.0),
            peg_vertical: ParamRange::new(0.0, 0.0),
            peg_spin: ParamRange::new(0.0, 0.0),
            big_bounce_chance: 0.0,
            big_bounce_scale: 1.0,
            avoid_bin: None,
        }
    }

    pub fn with_avoid_bin(mut self, avoid: AvoidBin) -> Self {
        self.avoid_bin = Some(avoid);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..0.5).contains(&self.jitter_fraction) {
            return Err(ConfigError::InvalidJitter(self.jitter_fraction));
        }
        if let MaterialProfile::Randomized {
            restitution,
            friction,
            air_friction,
        } = &self.material
        {
            restitution.validate("restitution")?;
            friction.validate("friction")?;
            air_friction.validate("air_friction")?;
        }
        self.launch_lateral.validate("launch_lateral")?;
        self.launch_vertical.validate("launch_vertical")?;
        self.launch_spin.validate("launch_spin")?;
        self.peg_lateral.validate("peg_lateral")?;
        self.peg_vertical.validate("peg_vertical")?;
        self.peg_spin.validate("peg_spin")?;
        check_probability("big_bounce_chance", self.big_bounce_chance)?;
        check_non_negative("big_bounce_scale", self.big_bounce_scale)?;
        // Big bounces sample the scaled peg ranges
        self.peg_lateral
            .scaled(self.big_bounce_scale)
            .validate("peg_lateral * big_bounce_scale")?;
        self.peg_vertical
            .scaled(self.big_bounce_scale)
            .validate("peg_vertical * big_bounce_scale")?;
        if let Some(avoid) = &self.avoid_bin {
            check_probability("avoid_bin.probability", avoid.probability)?;
            check_non_negative("avoid_bin.threshold", avoid.threshold)?;
            check_non_negative("avoid_bin.strength", avoid.strength)?;
        }
        Ok(())
    }

    /// Spawn offset from the slot center
    pub fn sample_jitter<R: Rng + ?Sized>(&self, slot_width: f32, rng: &mut R) -> f32 {
        ParamRange::symmetric(slot_width * self.jitter_fraction).sample(rng)
    }

    /// Initial kick and spin
    pub fn sample_launch<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vec2, f32) {
        let kick = Vec2::new(self.launch_lateral.sample(rng), self.launch_vertical.sample(rng));
        (kick, self.launch_spin.sample(rng))
    }

    /// Kick and spin delta for one peg hit
    pub fn sample_peg_kick<R: Rng + ?Sized>(&self, rng: &mut R) -> PegKick {
        let big = self.big_bounce_chance > 0.0 && rng.random_bool(self.big_bounce_chance.min(1.0));
        let scale = if big { self.big_bounce_scale } else { 1.0 };
        let impulse = Vec2::new(
            self.peg_lateral.scaled(scale).sample(rng),
            self.peg_vertical.scaled(scale).sample(rng),
        );
        PegKick {
            impulse,
            spin: self.peg_spin.sample(rng),
            big_bounce: big,
        }
    }
}

/// One sampled peg-collision kick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PegKick {
    pub impulse: Vec2,
    /// Added to the current angular velocity
    pub spin: f32,
    pub big_bounce: bool,
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability { name, value });
    }
    Ok(())
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(())
}
