//! Simulation state
//!
//! The simulation exclusively owns every body, spring and curve it steps.
//! Springs, wall contacts and enemies refer to them by index or handle.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::body::{Body, BodyKind};
use super::laps::{FinishLine, LapTracker};
use super::spring::Spring;
use super::tick::InputFlags;
use super::wall::WallContact;
use crate::consts::*;
use crate::error::SetupError;
use crate::leaderboard::Leaderboard;
use crate::track::HermiteCurve;

/// Handle to a curve registered in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveId(pub usize);

/// Race progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Start countdown, no forces are applied
    Countdown,
    Racing,
    /// Every racer reached the lap goal
    Finished,
}

/// Read-only per-body state for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub label: String,
    pub position: [f32; 3],
    /// Heading in radians from +X
    pub rotation: f32,
    pub collided: bool,
    pub laps: u32,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub bodies: Vec<Body>,
    pub springs: Vec<Spring>,
    pub(crate) curves: Vec<HermiteCurve>,
    pub wall_contacts: Vec<WallContact>,
    pub gravity: Vec3,
    /// Fixed step fed to `update` by the stepper
    pub timestep: f32,
    pub input: InputFlags,
    pub u_static: f32,
    pub u_kinetic: f32,
    pub wall_ks: f32,
    pub wall_kd: f32,
    /// Closest-point scan resolution
    pub scan_samples: usize,
    /// Simulated seconds since the race was created, countdown included
    pub elapsed: f64,
    pub countdown: f32,
    pub(crate) finish_line: Option<FinishLine>,
    pub lap_goal: u32,
    /// One tracker per body, same order as `bodies`
    pub(crate) laps: Vec<LapTracker>,
    pub leaderboard: Leaderboard,
    pub paused: bool,
    pub phase: RacePhase,
    /// Ticks applied after the countdown
    pub ticks: u64,
}

impl Simulation {
    pub fn new(gravity: Vec3, timestep: f32) -> Self {
        Self {
            bodies: Vec::new(),
            springs: Vec::new(),
            curves: Vec::new(),
            wall_contacts: Vec::new(),
            gravity,
            timestep,
            input: InputFlags::default(),
            u_static: 1.2,
            u_kinetic: 0.3,
            wall_ks: WALL_KS,
            wall_kd: WALL_KD,
            scan_samples: DEFAULT_SCAN_SAMPLES,
            elapsed: 0.0,
            countdown: COUNTDOWN_SECS,
            finish_line: None,
            lap_goal: 0,
            laps: Vec::new(),
            leaderboard: Leaderboard::new(),
            paused: false,
            phase: RacePhase::Countdown,
            ticks: 0,
        }
    }

    pub fn with_friction(mut self, u_static: f32, u_kinetic: f32) -> Self {
        self.u_static = u_static;
        self.u_kinetic = u_kinetic;
        self
    }

    pub fn with_countdown(mut self, countdown: f32) -> Self {
        self.countdown = countdown.max(0.0);
        self
    }

    pub fn with_wall_spring(mut self, ks: f32, kd: f32) -> Self {
        self.wall_ks = ks;
        self.wall_kd = kd;
        self
    }

    pub fn with_scan_samples(mut self, samples: usize) -> Self {
        self.scan_samples = samples.max(1);
        self
    }

    /// Register a curve for enemy paths and wall contacts
    pub fn add_curve(&mut self, curve: HermiteCurve) -> CurveId {
        self.curves.push(curve);
        CurveId(self.curves.len() - 1)
    }

    pub fn curve(&self, id: CurveId) -> Option<&HermiteCurve> {
        self.curves.get(id.0)
    }

    /// Add a body and return its index
    pub fn add_body(&mut self, body: Body) -> Result<usize, SetupError> {
        if let BodyKind::AiEnemy(enemy) = &body.kind {
            self.require_curve(enemy.path)?;
        }
        let tracker = match &self.finish_line {
            Some(line) => LapTracker::new(line, body.particle.pos),
            None => LapTracker::default(),
        };
        log::debug!("Adding body {} '{}'", self.bodies.len(), body.label);
        self.bodies.push(body);
        self.laps.push(tracker);
        Ok(self.bodies.len() - 1)
    }

    pub fn add_spring(&mut self, spring: Spring) -> Result<(), SetupError> {
        self.require_body(spring.a)?;
        self.require_body(spring.b)?;
        if spring.a == spring.b {
            return Err(SetupError::invalid("spring", "endpoints must differ"));
        }
        if spring.rest_length < 0.0 {
            return Err(SetupError::invalid("spring", "rest length must be >= 0"));
        }
        self.springs.push(spring);
        Ok(())
    }

    pub fn add_wall_contact(&mut self, contact: WallContact) -> Result<(), SetupError> {
        self.require_body(contact.body)?;
        self.require_curve(contact.curve)?;
        if !(contact.track_width > 0.0) {
            return Err(SetupError::invalid("track_width", "must be > 0"));
        }
        if !(contact.car_width >= 0.0 && contact.car_width < contact.track_width) {
            return Err(SetupError::invalid(
                "car_width",
                format!("must be in [0, {})", contact.track_width),
            ));
        }
        self.wall_contacts.push(contact);
        Ok(())
    }

    /// Place the finish gate and restart lap counting from current positions
    pub fn set_finish_line(&mut self, line: FinishLine, lap_goal: u32) {
        self.laps = self
            .bodies
            .iter()
            .map(|b| LapTracker::new(&line, b.particle.pos))
            .collect();
        self.finish_line = Some(line);
        self.lap_goal = lap_goal;
        log::info!("Finish line at {:?}, {} laps to go", line.position, lap_goal);
    }

    pub fn finish_line(&self) -> Option<&FinishLine> {
        self.finish_line.as_ref()
    }

    pub fn set_input(&mut self, input: InputFlags) {
        self.input = input;
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Seconds since the countdown ended (0 during the countdown)
    pub fn race_time(&self) -> f32 {
        (self.elapsed - f64::from(self.countdown)).max(0.0) as f32
    }

    /// Seconds left before forces are applied
    pub fn countdown_remaining(&self) -> f32 {
        (f64::from(self.countdown) - self.elapsed).max(0.0) as f32
    }

    pub fn laps(&self, body: usize) -> u32 {
        self.laps.get(body).map(LapTracker::laps).unwrap_or(0)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RacePhase::Finished
    }

    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(i, b)| BodySnapshot {
                label: b.label.clone(),
                position: b.particle.pos.to_array(),
                rotation: b.rotation(),
                collided: b.collided(),
                laps: self.laps(i),
            })
            .collect()
    }

    fn require_body(&self, index: usize) -> Result<(), SetupError> {
        if index < self.bodies.len() {
            Ok(())
        } else {
            Err(SetupError::UnknownBody(index))
        }
    }

    fn require_curve(&self, id: CurveId) -> Result<(), SetupError> {
        if id.0 < self.curves.len() {
            Ok(())
        } else {
            Err(SetupError::UnknownCurve(id.0))
        }
    }
}
