//! Contact detection and response for circles against circles and boxes
//!
//! Tokens and pegs are circles, walls and sensors are axis-aligned boxes.
//! Normals always point from the other shape toward the circle being tested,
//! so pushing the circle along the normal separates the pair.

use glam::Vec2;

use super::physics::Shape;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Closest point on the other shape
    pub point: Vec2,
    /// Surface normal (pointing toward the circle)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle against circle
pub fn circle_circle(pos: Vec2, radius: f32, other_pos: Vec2, other_radius: f32) -> CollisionResult {
    let delta = pos - other_pos;
    let dist_sq = delta.length_squared();
    let reach = radius + other_radius;
    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Concentric circles: push straight up, against gravity
    let normal = if dist > 1e-5 { delta / dist } else { Vec2::NEG_Y };
    CollisionResult {
        hit: true,
        point: other_pos + normal * other_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Circle against an axis-aligned box centered at `box_pos`
pub fn circle_rect(pos: Vec2, radius: f32, box_pos: Vec2, half_extents: Vec2) -> CollisionResult {
    let min = box_pos - half_extents;
    let max = box_pos + half_extents;
    let closest = pos.clamp(min, max);
    let delta = pos - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > 1e-10 {
        if dist_sq >= radius * radius {
            return CollisionResult::miss();
        }
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center inside the box: leave through the nearest face
    let to_min = pos - min;
    let to_max = max - pos;
    let candidates = [
        (to_min.x, Vec2::NEG_X),
        (to_max.x, Vec2::X),
        (to_min.y, Vec2::NEG_Y),
        (to_max.y, Vec2::Y),
    ];
    let (depth, normal) = candidates
        .iter()
        .copied()
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0.0, Vec2::NEG_Y));
    CollisionResult {
        hit: true,
        point: pos + normal * depth,
        normal,
        penetration: depth + radius,
    }
}

/// Check a circle against any shape
pub fn circle_shape(pos: Vec2, radius: f32, other_pos: Vec2, other: &Shape) -> CollisionResult {
    match *other {
        Shape::Circle { radius: r } => circle_circle(pos, radius, other_pos, r),
        Shape::Rect { half_extents } => circle_rect(pos, radius, other_pos, half_extents),
    }
}

/// Bounce velocity off a surface with restitution and tangential friction
///
/// Only an approaching normal component is reflected (scaled by
/// `restitution`). The tangential part is multiplied by `tangential_keep`.
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32, tangential_keep: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    let normal_part = normal * vn;
    let tangent_part = velocity - normal_part;
    tangent_part * tangential_keep - normal_part * restitution
}
