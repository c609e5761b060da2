//! Race configuration
//!
//! Static tuning loaded once at setup. Every section falls back to its
//! defaults, so a config file only needs the values it changes.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SetupError;
use crate::track::{HermiteSpec, TrackProfile, square_loop};

/// Global physics parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fixed simulation step (seconds)
    pub timestep: f32,
    /// Frame delta cap for the accumulator
    pub max_frame_dt: f32,
    pub u_static: f32,
    pub u_kinetic: f32,
    /// Closest-point scan resolution
    pub scan_samples: usize,
    /// Start countdown (seconds)
    pub countdown: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            timestep: SIM_DT,
            max_frame_dt: MAX_FRAME_DT,
            u_static: 1.2,
            u_kinetic: 0.3,
            scan_samples: DEFAULT_SCAN_SAMPLES,
            countdown: COUNTDOWN_SECS,
        }
    }
}

/// Track geometry and wall response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub curve: HermiteSpec,
    pub profile: TrackProfile,
    pub slices: usize,
    pub wall_ks: f32,
    pub wall_kd: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            curve: square_loop(),
            profile: TrackProfile {
                width: 2.0,
                wall_width: 0.8,
                wall_height: 0.4,
                road_thickness: 0.1,
            },
            slices: 64,
            wall_ks: WALL_KS,
            wall_kd: WALL_KD,
        }
    }
}

/// Player car tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub label: String,
    pub mass: f32,
    pub max_speed: f32,
    /// Uniform model scale, doubles as contact radius
    pub scale: f32,
    pub thrust: f32,
    pub brake: f32,
    pub turn_rate: f32,
    pub grip_scale: f32,
    /// Width used against the track walls
    pub width: f32,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            label: "player".to_string(),
            mass: 1.0,
            max_speed: DEFAULT_MAX_SPEED,
            scale: 0.2,
            thrust: DEFAULT_THRUST,
            brake: DEFAULT_BRAKE,
            turn_rate: DEFAULT_TURN_RATE,
            grip_scale: LATERAL_GRIP_SCALE,
            width: 0.4,
        }
    }
}

/// One AI opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub label: String,
    pub mass: f32,
    pub max_speed: f32,
    pub scale: f32,
    pub thrust: f32,
    pub seek_gain: f32,
    /// Sideways shift of the racing line from the centerline
    pub lane_offset: f32,
    /// Largest random sideways shift per control point
    pub path_jitter: f32,
    /// Start position as a curve parameter behind the line
    pub start_offset: f32,
    pub width: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            label: "enemy".to_string(),
            mass: 1.0,
            max_speed: 8.0,
            scale: 0.2,
            thrust: 6.0,
            seek_gain: 4.0,
            lane_offset: 0.0,
            path_jitter: 0.15,
            start_offset: 0.02,
            width: 0.4,
        }
    }
}

/// Race rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceRules {
    pub lap_goal: u32,
    /// Seed for the enemy racing lines
    pub seed: u64,
    /// Extra gate width beyond the track on each side
    pub gate_margin: f32,
    /// Curve parameter of the finish line (cars start here)
    pub finish_param: f32,
}

impl Default for RaceRules {
    fn default() -> Self {
        Self {
            lap_goal: 3,
            seed: 0x5eed,
            gate_margin: 0.5,
            finish_param: 0.0,
        }
    }
}

/// Complete race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub physics: PhysicsConfig,
    pub track: TrackConfig,
    pub player: CarConfig,
    pub enemies: Vec<EnemyConfig>,
    pub race: RaceRules,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            track: TrackConfig::default(),
            player: CarConfig::default(),
            enemies: vec![
                EnemyConfig {
                    label: "enemy-1".to_string(),
                    lane_offset: -0.4,
                    start_offset: 0.02,
                    ..Default::default()
                },
                EnemyConfig {
                    label: "enemy-2".to_string(),
                    lane_offset: 0.4,
                    start_offset: 0.04,
                    max_speed: 7.5,
                    ..Default::default()
                },
            ],
            race: RaceRules::default(),
        }
    }
}

impl RaceConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Loaded race config from {}", path.display());
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, SetupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SetupError> {
        let p = &self.physics;
        if !p.gravity.is_finite() {
            return Err(SetupError::invalid("gravity", "must be finite"));
        }
        if !(p.timestep > 0.0) {
            return Err(SetupError::invalid("timestep", "must be positive"));
        }
        if !(p.max_frame_dt >= p.timestep) {
            return Err(SetupError::invalid(
                "max_frame_dt",
                "must be at least one timestep",
            ));
        }
        if !(p.u_static >= 0.0 && p.u_kinetic >= 0.0) {
            return Err(SetupError::invalid("friction", "must be non-negative"));
        }
        if p.scan_samples == 0 {
            return Err(SetupError::invalid("scan_samples", "must be at least 1"));
        }
        if !(p.countdown >= 0.0) {
            return Err(SetupError::invalid("countdown", "must be non-negative"));
        }

        let t = &self.track;
        t.curve.validate()?;
        t.profile.validate()?;
        if t.slices < MIN_TRACK_SLICES {
            return Err(SetupError::TooFewSlices {
                got: t.slices,
                min: MIN_TRACK_SLICES,
            });
        }
        if !(t.wall_ks >= 0.0 && t.wall_kd >= 0.0) {
            return Err(SetupError::invalid("wall spring", "must be non-negative"));
        }
        if !t.curve.is_closed() {
            log::warn!("Track curve is not a closed loop");
        }

        let c = &self.player;
        validate_body(c.mass, c.max_speed, c.scale, c.width, t.profile.width)?;
        if !(c.grip_scale > 0.0) {
            return Err(SetupError::invalid("grip_scale", "must be positive"));
        }
        self.check_wall_stability(c.mass);

        for e in &self.enemies {
            validate_body(e.mass, e.max_speed, e.scale, e.width, t.profile.width)?;
            if !(e.path_jitter >= 0.0) {
                return Err(SetupError::invalid("path_jitter", "must be non-negative"));
            }
            if e.lane_offset.abs() + e.width / 2.0 > t.profile.width / 2.0 {
                log::warn!("Racing line of '{}' runs into the wall", e.label);
            }
            self.check_wall_stability(e.mass);
        }

        if self.race.lap_goal == 0 {
            return Err(SetupError::invalid("lap_goal", "must be at least 1"));
        }
        if !(self.race.gate_margin >= 0.0) {
            return Err(SetupError::invalid("gate_margin", "must be non-negative"));
        }
        if !self.race.finish_param.is_finite() {
            return Err(SetupError::invalid("finish_param", "must be finite"));
        }
        Ok(())
    }

    /// Explicit integration of a spring diverges once `ω·dt` reaches 2
    fn check_wall_stability(&self, mass: f32) {
        let omega = (self.track.wall_ks / mass).sqrt();
        let step = omega * self.physics.timestep;
        if step >= 2.0 {
            log::warn!(
                "Wall spring ks={} is too stiff for dt={} (ω·dt = {:.2})",
                self.track.wall_ks,
                self.physics.timestep,
                step
            );
        }
    }
}

fn validate_body(
    mass: f32,
    max_speed: f32,
    scale: f32,
    width: f32,
    track_width: f32,
) -> Result<(), SetupError> {
    if !(mass > 0.0) {
        return Err(SetupError::invalid("mass", "must be positive"));
    }
    if !(max_speed > 0.0) {
        return Err(SetupError::invalid("max_speed", "must be positive"));
    }
    if !(scale > 0.0) {
        return Err(SetupError::invalid("scale", "must be positive"));
    }
    if !(width >= 0.0 && width < track_width) {
        return Err(SetupError::invalid(
            "car width",
            format!("must be in [0, {track_width})"),
        ));
    }
    Ok(())
}
