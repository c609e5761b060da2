//! AI enemy: follows a precomputed reference path around the track

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use super::state::CurveId;
use crate::error::SimError;
use crate::track::{Frame, HermiteCurve};
use crate::{heading_angle, horizontal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    /// Reference path registered in the simulation
    pub path: CurveId,
    /// Constant thrust along the path tangent
    pub thrust: f32,
    /// Lateral pull toward the path, per unit offset and unit speed
    pub seek_gain: f32,
    /// Last heading, taken from the velocity while moving
    pub forward: Vec3,
    pub collided: bool,
}

impl Enemy {
    pub fn new(path: CurveId, thrust: f32, seek_gain: f32) -> Self {
        Self {
            path,
            thrust,
            seek_gain,
            forward: Vec3::X,
            collided: false,
        }
    }

    /// Thrust along the nearest path tangent plus a speed-scaled pull back
    /// onto the path. No obstacle avoidance.
    pub fn apply_inputs(
        &mut self,
        particle: &mut Particle,
        path: &HermiteCurve,
        samples: usize,
        gravity: Vec3,
        u_kinetic: f32,
    ) -> Result<(), SimError> {
        particle.apply_base_forces(gravity, u_kinetic)?;

        let frame = Frame::nearest(path, particle.pos, samples);
        particle.add_force(horizontal(frame.tangent) * self.thrust);

        let offset = frame.lateral_offset(particle.pos);
        let speed = particle.vel.length();
        particle.add_force(-frame.horizontal * (offset * self.seek_gain * speed));
        Ok(())
    }

    /// Track the heading of travel for rendering
    pub fn follow_velocity(&mut self, particle: &Particle) {
        if particle.is_moving() {
            let dir = horizontal(particle.vel);
            if dir != Vec3::ZERO {
                self.forward = dir;
            }
        }
    }

    pub fn rotation(&self) -> f32 {
        heading_angle(self.forward)
    }
}
