//! Deterministic race simulation
//!
//! All physics lives here:
//! - Fixed timestep only, driven by `FixedStepper`
//! - Stable iteration order (by body index)
//! - No rendering or platform dependencies

pub mod body;
pub mod car;
pub mod enemy;
pub mod laps;
pub mod particle;
pub mod spring;
pub mod state;
pub mod tick;
pub mod wall;

pub use body::{Body, BodyKind};
pub use car::Car;
pub use enemy::Enemy;
pub use laps::{Crossing, FinishLine, LapTracker};
pub use particle::{Particle, collide_pair};
pub use spring::{Spring, spring_damper_force};
pub use state::{BodySnapshot, CurveId, RacePhase, Simulation};
pub use tick::{FixedStepper, InputFlags, tick};
pub use wall::{WallContact, WallHit, WallSide};
