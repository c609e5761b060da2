//! Player car: throttle, brake, steering and tire grip
//!
//! The heading is player-controlled. It only changes through explicit turn
//! input and is never realigned to the velocity.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use super::tick::InputFlags;
use crate::consts::{DEFAULT_BRAKE, DEFAULT_THRUST, DEFAULT_TURN_RATE, LATERAL_GRIP_SCALE};
use crate::error::SimError;
use crate::{WORLD_UP, heading_angle, horizontal, rotate_about_up};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    /// Unit heading in the ground plane
    pub forward: Vec3,
    /// Set while a wall contact pushes on the car
    pub collided: bool,
    pub thrust: f32,
    pub brake: f32,
    /// Heading change while a turn key is held (rad/s)
    pub turn_rate: f32,
    /// Divisor applied to |v|² in the lateral grip force
    pub grip_scale: f32,
}

impl Car {
    pub fn new(forward: Vec3) -> Self {
        Self {
            forward: horizontal(forward),
            collided: false,
            thrust: DEFAULT_THRUST,
            brake: DEFAULT_BRAKE,
            turn_rate: DEFAULT_TURN_RATE,
            grip_scale: LATERAL_GRIP_SCALE,
        }
    }

    /// Unit vector to the right of the heading
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.forward.cross(WORLD_UP).normalize_or_zero()
    }

    /// Accumulate this tick's forces.
    ///
    /// With no input held and no movement last step the car is snapped to a
    /// full stop and receives no force at all this tick.
    pub fn apply_inputs(
        &mut self,
        particle: &mut Particle,
        input: &InputFlags,
        gravity: Vec3,
        u_static: f32,
        u_kinetic: f32,
    ) -> Result<(), SimError> {
        let normal = particle.apply_base_forces(gravity, u_kinetic)?;

        if !input.any() && !particle.is_moving() {
            particle.vel = Vec3::ZERO;
            particle.force = Vec3::ZERO;
            return Ok(());
        }

        let grip = normal * u_static * particle.vel.length_squared() / self.grip_scale;

        if input.accelerate {
            particle.add_force(self.forward * self.thrust);
        }
        if input.brake {
            particle.add_force(-self.forward * self.brake);
        }
        if input.right {
            particle.add_force(self.right() * grip);
        } else if input.left {
            particle.add_force(-self.right() * grip);
        }
        Ok(())
    }

    /// Rotate the heading after integration while a turn key is held
    pub fn steer(&mut self, input: &InputFlags, dt: f32) {
        let step = self.turn_rate * dt;
        if input.right {
            self.forward = horizontal(rotate_about_up(self.forward, -step));
        } else if input.left {
            self.forward = horizontal(rotate_about_up(self.forward, step));
        }
    }

    /// Heading angle for rendering
    pub fn rotation(&self) -> f32 {
        heading_angle(self.forward)
    }
}
