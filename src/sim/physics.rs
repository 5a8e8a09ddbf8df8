//! Physics engine interface
//!
//! The board only needs a handful of things from a rigid-body solver: create
//! bodies, add/remove them, push them around, and hear about new contacts.
//! Anything implementing [`PhysicsWorld`] can host the engine.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a body living in a physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned rectangle
    Rect { half_extents: Vec2 },
}

impl Shape {
    /// Smallest extent of the shape (used for sub-step sizing)
    pub fn min_extent(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Rect { half_extents } => half_extents.min_element(),
        }
    }
}

/// Category/mask pair controlling which bodies may interact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    pub fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Both sides must accept each other's category
    #[inline]
    pub fn can_collide(&self, other: &CollisionFilter) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

/// Surface and damping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Bounciness (combined as the max of a pair)
    pub restitution: f32,
    /// Tangential friction (combined as the min of a pair)
    pub friction: f32,
    /// Velocity loss per 1/60 s of flight
    pub air_friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.1,
            air_friction: 0.01,
        }
    }
}

/// A rigid body as seen through the world interface
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Body {
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub is_static: bool,
    /// Sensors report contacts but never push back
    pub is_sensor: bool,
    pub filter: CollisionFilter,
    pub material: Material,
}

impl Body {
    fn new(shape: Shape, position: Vec2) -> Self {
        Self {
            shape,
            position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            is_static: false,
            is_sensor: false,
            filter: CollisionFilter::default(),
            material: Material::default(),
        }
    }

    pub fn circle(position: Vec2, radius: f32) -> Self {
        Self::new(Shape::Circle { radius }, position)
    }

    /// Axis-aligned rectangle with full `width` x `height`
    pub fn rect(position: Vec2, width: f32, height: f32) -> Self {
        Self::new(
            Shape::Rect {
                half_extents: Vec2::new(width / 2.0, height / 2.0),
            },
            position,
        )
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Dynamic bodies are integrated; static ones never move
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !self.is_static
    }
}

/// Two bodies that started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    /// Build a pair with a stable (sorted) order
    pub fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    #[inline]
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }

    /// The other side of the pair, if `handle` is part of it
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }
}

/// The rigid-body solver the board runs inside
pub trait PhysicsWorld {
    /// Insert a body and return its handle
    fn add_body(&mut self, body: Body) -> BodyHandle;

    /// Remove a body. Returns false if it was already gone.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    fn contains(&self, handle: BodyHandle) -> bool;

    fn body(&self, handle: BodyHandle) -> Option<&Body>;

    /// All live handles in insertion order
    fn handles(&self) -> Vec<BodyHandle>;

    fn body_count(&self) -> usize;

    /// Apply an instantaneous, mass-normalized impulse (a velocity change)
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2);

    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_velocity: f32);

    /// Advance by `dt` seconds and report pairs that started touching
    fn step(&mut self, dt: f32) -> Vec<CollisionPair>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_requires_both_sides() {
        let peg = CollisionFilter::new(0x1, 0x2);
        let token = CollisionFilter::new(0x2, 0x1 | 0x4);
        let other_token = CollisionFilter::new(0x2, 0x1 | 0x4);
        assert!(peg.can_collide(&token));
        assert!(token.can_collide(&peg));
        assert!(!token.can_collide(&other_token));

        let marker = CollisionFilter::new(0x10, 0);
        assert!(!marker.can_collide(&token));
    }

    #[test]
    fn test_pair_order_is_stable() {
        let p = CollisionPair::new(BodyHandle(9), BodyHandle(3));
        assert_eq!(p.a, BodyHandle(3));
        assert_eq!(p.other(BodyHandle(3)), Some(BodyHandle(9)));
        assert_eq!(p.other(BodyHandle(4)), None);
        assert!(p.involves(BodyHandle(9)));
    }
}
