//! Reference rigid-body solver
//!
//! A small, deterministic [`PhysicsWorld`] good enough to run a Plinko board
//! headless and in tests. Dynamic bodies are expected to be circles; static
//! bodies and sensors may be circles or axis-aligned boxes.

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision::{CollisionResult, bounce_velocity, circle_shape};
use super::physics::{Body, BodyHandle, CollisionPair, PhysicsWorld, Shape};
use crate::consts::GRAVITY;

/// Maximum substeps per step to keep a fast body from tunneling
pub const MAX_SUBSTEPS: u32 = 20;

/// Normal approach speed below which contacts stop bouncing (pixels/s)
const REST_SPEED: f32 = 20.0;

/// Fraction of tangential speed removed per contact, scaled by friction
const TANGENT_DAMPING: f32 = 0.05;

/// Air friction is specified per 1/60 s of flight
const AIR_FRICTION_RATE: f32 = 60.0;

/// Deterministic sub-stepped world with collision-start reporting
#[derive(Debug, Clone)]
pub struct SimpleWorld {
    gravity: Vec2,
    /// Bodies sorted by handle (handles are allocated monotonically)
    bodies: Vec<(BodyHandle, Body)>,
    next_id: u32,
    /// Pairs touching at the end of the previous step
    touching: BTreeSet<CollisionPair>,
}

impl Default for SimpleWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, GRAVITY))
    }
}

impl SimpleWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            next_id: 1,
            touching: BTreeSet::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Direct mutable access, for hosts that teleport or inspect bodies
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        let idx = self.index_of(handle)?;
        Some(&mut self.bodies[idx].1)
    }

    fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.bodies.binary_search_by_key(&handle, |(h, _)| *h).ok()
    }

    /// Substep count so no dynamic body moves more than 30% of its size
    fn substeps(&self, dt: f32) -> u32 {
        self.bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic())
            .map(|(_, b)| {
                let step_size = (b.shape.min_extent() * 0.3).max(0.5);
                ((b.velocity.length() * dt) / step_size).ceil() as u32
            })
            .max()
            .unwrap_or(1)
            .clamp(1, MAX_SUBSTEPS)
    }

    fn integrate(&mut self, h: f32) {
        let gravity = self.gravity;
        for (_, body) in self.bodies.iter_mut().filter(|(_, b)| b.is_dynamic()) {
            let keep = (1.0 - body.material.air_friction)
                .clamp(0.0, 1.0)
                .powf(h * AIR_FRICTION_RATE);
            body.velocity = (body.velocity + gravity * h) * keep;
            body.position += body.velocity * h;
            body.angle += body.angular_velocity * h;
            body.angular_velocity *= keep;
        }
    }

    fn solve_contacts(&mut self, touching: &mut BTreeSet<CollisionPair>) {
        let n = self.bodies.len();
        for i in 0..n {
            if self.bodies[i].1.is_static {
                continue;
            }
            let Shape::Circle { radius } = self.bodies[i].1.shape else {
                continue;
            };

            for j in 0..n {
                if i == j {
                    continue;
                }
                let (ha, a) = self.bodies[i];
                let (hb, b) = self.bodies[j];
                // Dynamic pairs are handled once, from the lower index
                if b.is_dynamic() && j < i {
                    continue;
                }
                if !a.filter.can_collide(&b.filter) {
                    continue;
                }

                let contact = circle_shape(a.position, radius, b.position, &b.shape);
                if !contact.hit {
                    continue;
                }
                touching.insert(CollisionPair::new(ha, hb));

                if a.is_sensor || b.is_sensor {
                    continue;
                }

                let restitution = a.material.restitution.max(b.material.restitution);
                let friction = a.material.friction.min(b.material.friction);
                if b.is_dynamic() {
                    self.resolve_dynamic_pair(i, j, &contact, restitution);
                } else {
                    self.resolve_static_contact(i, radius, &contact, restitution, friction);
                }
            }
        }
    }

    fn resolve_static_contact(
        &mut self,
        idx: usize,
        radius: f32,
        contact: &CollisionResult,
        restitution: f32,
        friction: f32,
    ) {
        let body = &mut self.bodies[idx].1;
        let normal = contact.normal;
        body.position += normal * contact.penetration;

        let approach = -body.velocity.dot(normal);
        let restitution = if approach < REST_SPEED { 0.0 } else { restitution };
        let keep = 1.0 - friction.clamp(0.0, 1.0) * TANGENT_DAMPING;
        body.velocity = bounce_velocity(body.velocity, normal, restitution, keep);

        // Rolling contact drags the spin toward the surface speed
        let tangent = Vec2::new(-normal.y, normal.x);
        let rolling = body.velocity.dot(tangent) / radius.max(1e-3);
        body.angular_velocity += (rolling - body.angular_velocity) * friction.clamp(0.0, 1.0);
    }

    /// Equal-mass split for two dynamic circles
    fn resolve_dynamic_pair(&mut self, i: usize, j: usize, contact: &CollisionResult, restitution: f32) {
        let normal = contact.normal;
        let half = contact.penetration / 2.0;
        self.bodies[i].1.position += normal * half;
        self.bodies[j].1.position -= normal * half;

        let relative = self.bodies[i].1.velocity - self.bodies[j].1.velocity;
        let vn = relative.dot(normal);
        if vn < 0.0 {
            let impulse = -(1.0 + restitution) * vn / 2.0;
            self.bodies[i].1.velocity += normal * impulse;
            self.bodies[j].1.velocity -= normal * impulse;
        }
    }
}

impl PhysicsWorld for SimpleWorld {
    fn add_body(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.bodies.push((handle, body));
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        match self.index_of(handle) {
            Some(idx) => {
                self.bodies.remove(idx);
                self.touching.retain(|pair| !pair.involves(handle));
                true
            }
            None => false,
        }
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.index_of(handle).is_some()
    }

    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.index_of(handle).map(|idx| &self.bodies[idx].1)
    }

    fn handles(&self) -> Vec<BodyHandle> {
        self.bodies.iter().map(|(h, _)| *h).collect()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.velocity += impulse;
            }
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_velocity: f32) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.angular_velocity = angular_velocity;
            }
        }
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        if dt <= 0.0 {
            return Vec::new();
        }

        let substeps = self.substeps(dt);
        let h = dt / substeps as f32;
        let mut touching = BTreeSet::new();
        for _ in 0..substeps {
            self.integrate(h);
            self.solve_contacts(&mut touching);
        }

        let started: Vec<CollisionPair> = touching.difference(&self.touching).copied().collect();
        self.touching = touching;
        started
    }
}
