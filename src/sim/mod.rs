//! Deterministic simulation module
//!
//! Everything that decides where a token lands lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body handle)
//! - No rendering, audio or platform dependencies

pub mod board;
pub mod chaos;
pub mod collision;
pub mod drop;
pub mod engine;
pub mod events;
pub mod physics;
pub mod resolve;
pub mod world;

pub use board::{BoardLayout, ColumnCount, Peg, Rect};
pub use chaos::{AvoidBin, ChaosConfig, MaterialProfile, ParamRange, PegKick};
pub use collision::CollisionResult;
pub use drop::{ActiveToken, DropController, DropOutcome, TokenPhase};
pub use engine::{Celebration, EngineEvent, PlinkoEngine};
pub use events::{CollisionRouter, Subscription, SubscriptionId};
pub use physics::{Body, BodyHandle, CollisionFilter, CollisionPair, Material, PhysicsWorld, Shape};
pub use world::SimpleWorld;
