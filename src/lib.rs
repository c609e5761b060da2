//! Marble Racer - physics and track-geometry core
//!
//! Core modules:
//! - `track`: Hermite track curve, curve frames, extruded track mesh
//! - `sim`: Fixed-step particle simulation (cars, enemies, walls, laps)
//! - `setup`: Builds a race from static configuration
//! - `config`: Data-driven race tuning
//! - `leaderboard`: Finish order bookkeeping
//!
//! Rendering, camera and input wiring live in the JS presentation layer,
//! which talks to the core through `web` on wasm32.

pub mod config;
pub mod error;
pub mod leaderboard;
pub mod setup;
pub mod sim;
pub mod track;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::RaceConfig;
pub use error::{RaceError, SetupError, SimError};
pub use leaderboard::{FinishRecord, Leaderboard};
pub use setup::{Race, build_race};

use glam::{Quat, Vec3};

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (1 kHz keeps the wall springs stable)
    pub const SIM_DT: f32 = 0.001;
    /// Largest frame delta fed into the accumulator
    pub const MAX_FRAME_DT: f32 = 1.0 / 30.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 64;

    /// Start countdown before forces are applied (seconds)
    pub const COUNTDOWN_SECS: f32 = 3.0;

    /// A body that moved less than this last step counts as resting
    pub const MOVING_EPSILON: f32 = 1e-5;

    /// Default closest-point scan resolution
    pub const DEFAULT_SCAN_SAMPLES: usize = 64;
    /// Fewest slices that still form a closed tube
    pub const MIN_TRACK_SLICES: usize = 3;

    /// Default velocity clamp
    pub const DEFAULT_MAX_SPEED: f32 = 30.0;
    /// Forward thrust while accelerating (N)
    pub const DEFAULT_THRUST: f32 = 15.0;
    /// Reverse thrust while braking (N)
    pub const DEFAULT_BRAKE: f32 = 7.5;
    /// Heading change while a turn key is held (rad/s, 2/1000 per 1 ms step)
    pub const DEFAULT_TURN_RATE: f32 = 2.0;
    /// Divisor applied to |v|^2 in the lateral grip force
    pub const LATERAL_GRIP_SCALE: f32 = 75.0;

    /// Wall contact spring stiffness
    pub const WALL_KS: f32 = 5000.0;
    /// Wall contact damping
    pub const WALL_KD: f32 = 100.0;

    /// Forces above `mass * max_speed / dt` times this are reported as diverging
    pub const DIVERGENCE_FACTOR: f32 = 10.0;
}

/// World up axis
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Project onto the ground plane and renormalize (zero stays zero)
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Rotate a vector about the world up axis
#[inline]
pub fn rotate_about_up(v: Vec3, angle: f32) -> Vec3 {
    Quat::from_rotation_y(angle) * v
}

/// Heading of a forward vector in radians from +X in the XZ plane.
///
/// Directions with z < 0 map to the reflex angle, so the result is in [0, 2π).
pub fn heading_angle(forward: Vec3) -> f32 {
    let flat = horizontal(forward);
    if flat == Vec3::ZERO {
        return 0.0;
    }
    let theta = flat.dot(Vec3::X).clamp(-1.0, 1.0).acos();
    if flat.z < 0.0 {
        std::f32::consts::TAU - theta
    } else {
        theta
    }
}
