//! Token drop controller
//!
//! At most one token is in flight. A drop request while one is active is a
//! quiet no-op, never queued. The active token carries its own collision
//! subscription, released by [`DropController::release`] when it lands.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::{BoardLayout, ColumnCount};
use super::chaos::{AvoidBin, ChaosConfig, PegKick};
use super::events::{CollisionRouter, Subscription};
use super::physics::{Body, BodyHandle, CollisionFilter, Material, PhysicsWorld};
use crate::consts::{PEG_CATEGORY, SENSOR_CATEGORY, TOKEN_CATEGORY, WALL_CATEGORY, WIDTH};

/// Below this speed (px/s) a token counts as stalled
const STALL_SPEED: f32 = 10.0;

/// Consecutive stalled ticks before the token is shaken loose
pub const STALL_TICKS: u32 = 30;

/// Velocity change for a stalled token: toward the board center and up
const STALL_KICK: Vec2 = Vec2::new(150.0, -150.0);

/// Lifecycle of one token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPhase {
    /// Added to the world, not yet stepped
    Spawned,
    /// Falling through the pegs
    InFlight,
    /// Landed and removed (terminal)
    Resolved,
}

/// The single token currently owned by the controller
#[derive(Debug)]
pub struct ActiveToken {
    pub handle: BodyHandle,
    pub slot: usize,
    pub spawn_x: f32,
    pub material: Material,
    pub phase: TokenPhase,
    pub peg_hits: u32,
    /// Times the token was shaken loose after wedging
    pub stall_kicks: u32,
    still_ticks: u32,
    subscription: Option<Subscription>,
}

impl ActiveToken {
    /// Spawned -> InFlight; other phases are left alone
    pub fn mark_in_flight(&mut self) {
        if self.phase == TokenPhase::Spawned {
            self.phase = TokenPhase::InFlight;
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

/// Result of a drop request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOutcome {
    Dropped { handle: BodyHandle, slot: usize, x: f32 },
    /// A token is already in flight; nothing happened
    Busy,
}

impl DropOutcome {
    pub fn dropped(&self) -> bool {
        matches!(self, DropOutcome::Dropped { .. })
    }
}

/// Owns the active-token flag and the drop protocol
#[derive(Debug, Default)]
pub struct DropController {
    active: Option<ActiveToken>,
    total_drops: u64,
}

impl DropController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveToken> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveToken> {
        self.active.as_mut()
    }

    pub fn total_drops(&self) -> u64 {
        self.total_drops
    }

    /// Spawn a token into `world` unless one is already active
    pub fn drop_token<W: PhysicsWorld, R: Rng + ?Sized>(
        &mut self,
        world: &mut W,
        router: &mut CollisionRouter,
        layout: &BoardLayout,
        chaos: &ChaosConfig,
        rng: &mut R,
        slot: Option<usize>,
    ) -> DropOutcome {
        if self.active.is_some() {
            log::debug!("Drop ignored: a token is already in flight");
            return DropOutcome::Busy;
        }

        let slot = choose_slot(slot, layout.columns, rng);
        let x = spawn_x(layout, slot, chaos, rng);
        let material = chaos.material.sample(layout.columns, rng);
        let handle = world.add_body(token_body(Vec2::new(x, 0.0), layout.token_radius(), material));

        let (kick, spin) = chaos.sample_launch(rng);
        world.apply_impulse(handle, kick);
        world.set_angular_velocity(handle, spin);
        if let Some(avoid) = &chaos.avoid_bin {
            avoid_bin_nudge(world, handle, layout, avoid, rng);
        }

        let subscription = router.subscribe(handle);
        self.active = Some(ActiveToken {
            handle,
            slot,
            spawn_x: x,
            material,
            phase: TokenPhase::Spawned,
            peg_hits: 0,
            stall_kicks: 0,
            still_ticks: 0,
            subscription: Some(subscription),
        });
        self.total_drops += 1;

        log::debug!(
            "Dropped token {:?} from slot {} at x={:.1} (restitution {:.2}, friction {:.2}, air {:.3})",
            handle,
            slot,
            x,
            material.restitution,
            material.friction,
            material.air_friction
        );
        DropOutcome::Dropped { handle, slot, x }
    }

    /// React to the active token hitting a peg: chaos kick, spin, optional nudge
    pub fn on_peg_hit<W: PhysicsWorld, R: Rng + ?Sized>(
        &mut self,
        world: &mut W,
        layout: &BoardLayout,
        chaos: &ChaosConfig,
        rng: &mut R,
        token: BodyHandle,
    ) -> Option<PegKick> {
        let active = self.active.as_mut().filter(|a| a.handle == token)?;
        let spin_now = world.body(token)?.angular_velocity;

        let kick = chaos.sample_peg_kick(rng);
        world.apply_impulse(token, kick.impulse);
        world.set_angular_velocity(token, spin_now + kick.spin);
        active.peg_hits += 1;
        if kick.big_bounce {
            log::trace!("Big bounce on token {:?}: {:?}", token, kick.impulse);
        } else {
            log::trace!("Peg kick on token {:?}: {:?}", token, kick.impulse);
        }

        if let Some(avoid) = &chaos.avoid_bin {
            avoid_bin_nudge(world, token, layout, avoid, rng);
        }
        Some(kick)
    }

    /// Shake the active token loose once it has sat still for
    /// [`STALL_TICKS`] ticks, e.g. wedged between a wall and a peg.
    /// Call once per tick after stepping. Returns true when a kick was applied.
    pub fn check_stall<W: PhysicsWorld>(&mut self, world: &mut W) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let Some((speed, x)) = world.body(active.handle).map(|b| (b.velocity.length(), b.position.x)) else {
            return false;
        };
        if speed >= STALL_SPEED {
            active.still_ticks = 0;
            return false;
        }
        active.still_ticks += 1;
        if active.still_ticks < STALL_TICKS {
            return false;
        }

        active.still_ticks = 0;
        active.stall_kicks += 1;
        let direction = if x < WIDTH / 2.0 { 1.0 } else { -1.0 };
        world.apply_impulse(active.handle, Vec2::new(direction * STALL_KICK.x, STALL_KICK.y));
        log::debug!(
            "Token {:?} stalled at x={:.1}, kick #{}",
            active.handle,
            x,
            active.stall_kicks
        );
        true
    }

    /// End the active token's life if it is `handle`: unsubscribe its
    /// handler and clear the active flag. Returns the retired token.
    pub fn release(&mut self, router: &mut CollisionRouter, handle: BodyHandle) -> Option<ActiveToken> {
        if self.active.as_ref().map(|a| a.handle) != Some(handle) {
            return None;
        }
        let mut token = self.active.take()?;
        if let Some(subscription) = token.subscription.take() {
            router.unsubscribe(subscription);
        }
        token.phase = TokenPhase::Resolved;
        Some(token)
    }

    /// Drop the active token without resolving it (board rebuilds)
    pub fn abandon(&mut self, router: &mut CollisionRouter) -> Option<ActiveToken> {
        let handle = self.active.as_ref()?.handle;
        self.release(router, handle)
    }
}

/// Requested slot if valid, otherwise a uniformly random one
pub fn choose_slot<R: Rng + ?Sized>(requested: Option<usize>, columns: ColumnCount, rng: &mut R) -> usize {
    match requested {
        Some(slot) if slot < columns.get() => slot,
        _ => rng.random_range(0..columns.get()),
    }
}

/// Slot center plus jitter, kept inside the play field
pub fn spawn_x<R: Rng + ?Sized>(layout: &BoardLayout, slot: usize, chaos: &ChaosConfig, rng: &mut R) -> f32 {
    let center = layout.drop_slots[slot.min(layout.drop_slots.len() - 1)];
    let x = center + chaos.sample_jitter(layout.slot_width(), rng);
    let (left, right) = layout.token_x_range();
    x.clamp(left, right)
}

/// Dynamic token body: collides with pegs and walls, is seen by the sensor,
/// never touches another token
pub fn token_body(position: Vec2, radius: f32, material: Material) -> Body {
    Body::circle(position, radius)
        .with_filter(CollisionFilter::new(
            TOKEN_CATEGORY,
            PEG_CATEGORY | WALL_CATEGORY | SENSOR_CATEGORY,
        ))
        .with_material(material)
}

/// Occasionally push a token away from the avoided bin's center. Returns
/// true when a nudge was applied.
pub fn avoid_bin_nudge<W: PhysicsWorld, R: Rng + ?Sized>(
    world: &mut W,
    token: BodyHandle,
    layout: &BoardLayout,
    avoid: &AvoidBin,
    rng: &mut R,
) -> bool {
    let Some(center) = layout.bin_center(avoid.bin) else {
        return false;
    };
    let Some(body) = world.body(token) else {
        return false;
    };
    let offset = body.position.x - center;
    let limit = avoid.threshold * layout.slot_width();
    if limit.is_nan() || offset.abs() > limit {
        return false;
    }
    if !rng.random_bool(avoid.probability.clamp(0.0, 1.0)) {
        return false;
    }

    let direction = if offset > 0.0 {
        1.0
    } else if offset < 0.0 {
        -1.0
    } else if rng.random_bool(0.5) {
        1.0
    } else {
        -1.0
    };
    world.apply_impulse(token, Vec2::new(direction * avoid.strength, 0.0));
    log::trace!("Avoid-bin nudge on token {:?} away from bin {}", token, avoid.bin);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::SimpleWorld;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        world: SimpleWorld,
        router: CollisionRouter,
        layout: BoardLayout,
        rng: Pcg32,
        controller: DropController,
    }

    fn fixture(columns: ColumnCount) -> Fixture {
        Fixture {
            world: SimpleWorld::default(),
            router: CollisionRouter::new(),
            layout: BoardLayout::generate(columns),
            rng: Pcg32::seed_from_u64(1234),
            controller: DropController::new(),
        }
    }

    #[test]
    fn test_forced_slot_spawns_inside_slot_span() {
        let chaos = ChaosConfig::wild();
        for seed in 0..50 {
            let mut f = fixture(ColumnCount::Seven);
            f.rng = Pcg32::seed_from_u64(seed);
            let outcome = f.controller.drop_token(
                &mut f.world,
                &mut f.router,
                &f.layout,
                &chaos,
                &mut f.rng,
                Some(3),
            );
            let DropOutcome::Dropped { slot, x, handle } = outcome else {
                panic!("expected a drop");
            };
            assert_eq!(slot, 3);
            let (left, right) = f.layout.slot_span(3).unwrap();
            assert!(x >= left && x < right, "x = {} outside [{}, {})", x, left, right);
            assert_eq!(f.world.body(handle).unwrap().position.y, 0.0);
        }
    }

    #[test]
    fn test_second_drop_is_a_no_op() {
        let mut f = fixture(ColumnCount::Nine);
        let chaos = ChaosConfig::classic();
        let first = f
            .controller
            .drop_token(&mut f.world, &mut f.router, &f.layout, &chaos, &mut f.rng, None);
        assert!(first.dropped());
        let bodies = f.world.body_count();

        let second = f
            .controller
            .drop_token(&mut f.world, &mut f.router, &f.layout, &chaos, &mut f.rng, Some(0));
        assert_eq!(second, DropOutcome::Busy);
        assert_eq!(f.world.body_count(), bodies);
        assert_eq!(f.router.len(), 1);
        assert_eq!(f.controller.total_drops(), 1);
    }

    #[test]
    fn test_invalid_slot_falls_back_to_random() {
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..100 {
            let slot = choose_slot(Some(42), ColumnCount::Seven, &mut rng);
            assert!(slot < 7);
        }
        assert_eq!(choose_slot(Some(6), ColumnCount::Seven, &mut rng), 6);
    }

    #[test]
    fn test_token_filter_skips_other_tokens() {
        let a = token_body(Vec2::ZERO, 10.0, Material::default());
        let b = token_body(Vec2::ZERO, 10.0, Material::default());
        assert!(!a.filter.can_collide(&b.filter));
        assert!(a.filter.can_collide(&CollisionFilter::new(PEG_CATEGORY, TOKEN_CATEGORY)));
        assert!(a.filter.can_collide(&CollisionFilter::new(WALL_CATEGORY, TOKEN_CATEGORY)));
    }

    #[test]
    fn test_release_unsubscribes_and_unblocks() {
        let mut f = fixture(ColumnCount::Nine);
        let chaos = ChaosConfig::classic();
        let DropOutcome::Dropped { handle, .. } =
            f.controller
                .drop_token(&mut f.world, &mut f.router, &f.layout, &chaos, &mut f.rng, None)
        else {
            panic!("expected a drop");
        };

        // Unknown handle leaves the active token alone
        assert!(f.controller.release(&mut f.router, BodyHandle(9999)).is_none());
        assert!(f.controller.is_active());

        let token = f.controller.release(&mut f.router, handle).unwrap();
        assert_eq!(token.phase, TokenPhase::Resolved);
        assert!(!token.is_subscribed());
        assert!(f.router.is_empty());
        assert!(!f.controller.is_active());
        assert!(f.controller.release(&mut f.router, handle).is_none());
    }

    #[test]
    fn test_peg_hit_kicks_only_active_token() {
        let mut f = fixture(ColumnCount::Nine);
        let chaos = ChaosConfig::classic();
        let DropOutcome::Dropped { handle, .. } =
            f.controller
                .drop_token(&mut f.world, &mut f.router, &f.layout, &chaos, &mut f.rng, Some(4))
        else {
            panic!("expected a drop");
        };

        assert!(f
            .controller
            .on_peg_hit(&mut f.world, &f.layout, &chaos, &mut f.rng, BodyHandle(9999))
            .is_none());
        assert!(f
            .controller
            .on_peg_hit(&mut f.world, &f.layout, &chaos, &mut f.rng, handle)
            .is_some());
        assert_eq!(f.controller.active().unwrap().peg_hits, 1);
    }

    #[test]
    fn test_avoid_bin_nudges_away_from_center() {
        let layout = BoardLayout::generate(ColumnCount::Seven);
        let mut world = SimpleWorld::default();
        let center = layout.bin_center(2).unwrap();
        let token = world.add_body(token_body(Vec2::new(center + 5.0, 100.0), 16.0, Material::default()));
        let mut rng = Pcg32::seed_from_u64(0);

        let always = AvoidBin {
            probability: 1.0,
            ..AvoidBin::new(2)
        };
        assert!(avoid_bin_nudge(&mut world, token, &layout, &always, &mut rng));
        assert!(world.body(token).unwrap().velocity.x > 0.0);

        // Far from the avoided bin: nothing happens
        let far = AvoidBin {
            probability: 1.0,
            ..AvoidBin::new(6)
        };
        assert!(!avoid_bin_nudge(&mut world, token, &layout, &far, &mut rng));

        // Out-of-range bin is ignored
        let missing = AvoidBin {
            probability: 1.0,
            ..AvoidBin::new(40)
        };
        assert!(!avoid_bin_nudge(&mut world, token, &layout, &missing, &mut rng));
    }

    #[test]
    fn test_avoid_bin_is_rare_by_default() {
        let layout = BoardLayout::generate(ColumnCount::Seven);
        let mut world = SimpleWorld::default();
        let center = layout.bin_center(3).unwrap();
        let token = world.add_body(token_body(Vec2::new(center, 100.0), 16.0, Material::default()));
        let mut rng = Pcg32::seed_from_u64(99);
        let avoid = AvoidBin::new(3);
        let nudges = (0..10_000)
            .filter(|_| avoid_bin_nudge(&mut world, token, &layout, &avoid, &mut rng))
            .count();
        assert!(nudges < 200, "nudges: {}", nudges);
        assert!(nudges > 0);
    }

    #[test]
    fn test_stalled_token_gets_kicked_toward_center() {
        let layout = BoardLayout::generate(ColumnCount::Seven);
        let mut world = SimpleWorld::new(Vec2::ZERO);
        let mut router = CollisionRouter::new();
        let mut controller = DropController::new();
        let mut rng = Pcg32::seed_from_u64(9);
        let chaos = ChaosConfig::still();

        let DropOutcome::Dropped { handle, .. } =
            controller.drop_token(&mut world, &mut router, &layout, &chaos, &mut rng, Some(0))
        else {
            panic!("expected a drop");
        };
        assert_eq!(world.body(handle).unwrap().velocity, Vec2::ZERO);

        for _ in 0..STALL_TICKS - 1 {
            assert!(!controller.check_stall(&mut world));
        }
        assert!(controller.check_stall(&mut world));
        let velocity = world.body(handle).unwrap().velocity;
        assert!(velocity.x > 0.0, "left-side token should move right");
        assert!(velocity.y < 0.0);
        assert_eq!(controller.active().unwrap().stall_kicks, 1);

        // Moving again: the counter starts over
        assert!(!controller.check_stall(&mut world));
    }

    #[test]
    fn test_stalled_token_on_right_moves_left() {
        let layout = BoardLayout::generate(ColumnCount::Nine);
        let mut world = SimpleWorld::new(Vec2::ZERO);
        let mut router = CollisionRouter::new();
        let mut controller = DropController::new();
        let mut rng = Pcg32::seed_from_u64(10);

        controller.drop_token(&mut world, &mut router, &layout, &ChaosConfig::still(), &mut rng, Some(8));
        for _ in 0..STALL_TICKS {
            controller.check_stall(&mut world);
        }
        let handle = controller.active().unwrap().handle;
        assert!(world.body(handle).unwrap().velocity.x < 0.0);
    }

    #[test]
    fn test_avoid_bin_ignores_nan_threshold() {
        let layout = BoardLayout::generate(ColumnCount::Seven);
        let mut world = SimpleWorld::default();
        let center = layout.bin_center(3).unwrap();
        let token = world.add_body(token_body(Vec2::new(center, 100.0), 16.0, Material::default()));
        let mut rng = Pcg32::seed_from_u64(0);

        let broken = AvoidBin {
            probability: 1.0,
            threshold: f32::NAN,
            ..AvoidBin::new(3)
        };
        assert!(!avoid_bin_nudge(&mut world, token, &layout, &broken, &mut rng));
        assert_eq!(world.body(token).unwrap().velocity, Vec2::ZERO);
    }
}
