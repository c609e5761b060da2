//! Point-mass particle state and semi-implicit Euler integration

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_SPEED, DIVERGENCE_FACTOR, MOVING_EPSILON};
use crate::error::SimError;
use crate::horizontal;

/// A point mass with a per-tick force accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub mass: f32,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Acceleration from the last integration step
    pub acc: Vec3,
    /// External force accumulator, rebuilt every tick
    pub force: Vec3,
    /// Model scale; the horizontal extent doubles as collision radius
    pub scale: Vec3,
    /// Must be set before the particle is stepped
    pub valid: bool,
    /// Position change over the last integration step
    pub delta_pos: Vec3,
    /// Velocity magnitude clamp
    pub max_speed: f32,
    #[serde(skip)]
    divergence_reported: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            mass: 0.0,
            pos: Vec3::ZERO,
            vel: Vec3::ZERO,
            acc: Vec3::ZERO,
            force: Vec3::ZERO,
            scale: Vec3::ZERO,
            valid: false,
            delta_pos: Vec3::ZERO,
            max_speed: DEFAULT_MAX_SPEED,
            divergence_reported: false,
        }
    }
}

impl Particle {
    /// Create an initialized particle at rest
    pub fn new(mass: f32, pos: Vec3) -> Self {
        Self {
            mass,
            pos,
            scale: Vec3::splat(0.2),
            valid: mass > 0.0 && pos.is_finite(),
            ..Default::default()
        }
    }

    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.vel = vel;
        self
    }

    #[inline]
    pub fn ensure_valid(&self) -> Result<(), SimError> {
        if self.valid {
            Ok(())
        } else {
            Err(SimError::NotInitialized)
        }
    }

    /// True when the particle actually moved during the last step
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.delta_pos.length() > MOVING_EPSILON
    }

    /// Radius used for particle-particle contact
    #[inline]
    pub fn collision_radius(&self) -> f32 {
        self.scale.x.max(self.scale.z)
    }

    #[inline]
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Reset the accumulator and apply gravity, ground support and kinetic
    /// friction. Friction only acts if the particle moved last step, so a
    /// resting particle is not pushed back and forth.
    ///
    /// Returns the magnitude of the ground normal force.
    pub fn apply_base_forces(&mut self, gravity: Vec3, u_kinetic: f32) -> Result<f32, SimError> {
        self.ensure_valid()?;
        self.force = gravity * self.mass;
        let normal_force = -self.force;
        self.force += normal_force;

        let normal = normal_force.length();
        if self.is_moving() {
            let kinetic = normal * u_kinetic;
            self.force -= self.vel.normalize_or_zero() * kinetic;
        }
        Ok(normal)
    }

    /// Advance one step with semi-implicit Euler.
    ///
    /// Velocity is clamped to `max_speed` (direction preserved) and the
    /// position is clamped to the ground plane; velocity is left untouched
    /// by the ground clamp.
    pub fn integrate(&mut self, dt: f32) -> Result<(), SimError> {
        self.ensure_valid()?;
        self.sanitize_force(dt);

        let old_pos = self.pos;
        self.acc = self.force / self.mass;
        self.vel += self.acc * dt;
        self.vel = self.vel.clamp_length_max(self.max_speed);
        if !self.vel.is_finite() {
            log::warn!("Non-finite velocity {:?}, stopping particle", self.vel);
            self.vel = Vec3::ZERO;
        }

        self.pos += self.vel * dt;
        if self.pos.y < 0.0 {
            self.pos.y = 0.0;
        }
        self.delta_pos = self.pos - old_pos;
        Ok(())
    }

    /// Drop non-finite forces and report forces far beyond what the speed
    /// clamp could ever need (stiff springs against too large a timestep).
    fn sanitize_force(&mut self, dt: f32) {
        if !self.force.is_finite() {
            log::warn!("Dropping non-finite force {:?}", self.force);
            self.force = Vec3::ZERO;
            return;
        }
        if cfg!(debug_assertions) && !self.divergence_reported {
            let limit = DIVERGENCE_FACTOR * self.mass * self.max_speed / dt;
            if self.force.length() > limit {
                log::warn!(
                    "Force {:.1} exceeds {:.1} at {:?}; spring constants may be too stiff for dt={}",
                    self.force.length(),
                    limit,
                    self.pos,
                    dt
                );
                self.divergence_reported = true;
            }
        }
    }
}

/// Push two overlapping particles apart.
///
/// Contact when the centers are within the sum of the collision radii. Each
/// body pushes the other with `|v_a + v_b|²`, and both sides of the pair are
/// applied in this one call, so each receives `2·|v_a + v_b|²` along the
/// horizontal line between them, in opposite directions. Call it once per
/// unordered pair. Returns whether they touched.
pub fn collide_pair(a: &mut Particle, b: &mut Particle) -> bool {
    let offset = b.pos - a.pos;
    if offset.length() > a.collision_radius() + b.collision_radius() {
        return false;
    }
    let dir = horizontal(offset);
    let magnitude = 2.0 * (a.vel + b.vel).length_squared();
    a.force -= dir * magnitude;
    b.force += dir * magnitude;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const G: Vec3 = Vec3::new(0.0, -9.8, 0.0);

    #[test]
    fn test_uninitialized_particle_rejected() {
        let mut p = Particle::default();
        assert_eq!(p.integrate(0.001), Err(SimError::NotInitialized));
        assert_eq!(p.apply_base_forces(G, 0.5), Err(SimError::NotInitialized));
    }

    #[test]
    fn test_zero_mass_is_not_valid() {
        assert!(!Particle::new(0.0, Vec3::ZERO).valid);
    }

    #[test]
    fn test_gravity_cancelled_by_ground() {
        let mut p = Particle::new(2.0, Vec3::ZERO);
        let normal = p.apply_base_forces(G, 0.5).unwrap();
        assert!((normal - 19.6).abs() < 1e-4);
        assert_eq!(p.force, Vec3::ZERO);
    }

    #[test]
    fn test_friction_only_when_moving() {
        let mut p = Particle::new(1.0, Vec3::ZERO).with_velocity(Vec3::new(1.0, 0.0, 0.0));
        p.apply_base_forces(G, 0.5).unwrap();
        assert_eq!(p.force, Vec3::ZERO);

        p.integrate(0.01).unwrap();
        assert!(p.is_moving());
        p.apply_base_forces(G, 0.5).unwrap();
        assert!((p.force.x + 4.9).abs() < 1e-4);
    }

    #[test]
    fn test_integrate_records_delta() {
        let mut p = Particle::new(1.0, Vec3::new(0.0, 1.0, 0.0));
        p.force = Vec3::new(10.0, 0.0, 0.0);
        p.integrate(0.1).unwrap();
        assert!((p.vel.x - 1.0).abs() < 1e-6);
        assert!((p.pos.x - 0.1).abs() < 1e-6);
        assert!((p.delta_pos.x - 0.1).abs() < 1e-6);
        assert_eq!(p.acc, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_non_finite_force_dropped() {
        let mut p = Particle::new(1.0, Vec3::ZERO);
        p.force = Vec3::new(f32::NAN, 0.0, 0.0);
        p.integrate(0.001).unwrap();
        assert!(p.pos.is_finite());
        assert_eq!(p.vel, Vec3::ZERO);
    }

    #[test]
    fn test_collision_forces_are_opposite() {
        let mut a = Particle::new(1.0, Vec3::ZERO).with_velocity(Vec3::new(1.0, 0.0, 0.0));
        let mut b = Particle::new(1.0, Vec3::new(0.3, 0.0, 0.0))
            .with_velocity(Vec3::new(0.0, 0.0, 2.0));
        assert!(collide_pair(&mut a, &mut b));
        assert!((a.force + b.force).length() < 1e-6);
        assert!((b.force.length() - 10.0).abs() < 1e-5);
        assert!(b.force.x > 0.0);
    }

    #[test]
    fn test_no_collision_when_apart() {
        let mut a = Particle::new(1.0, Vec3::ZERO);
        let mut b = Particle::new(1.0, Vec3::new(1.0, 0.0, 0.0));
        assert!(!collide_pair(&mut a, &mut b));
        assert_eq!(a.force, Vec3::ZERO);
    }

    proptest! {
        #[test]
        fn prop_speed_clamped(fx in -1e5f32..1e5, fy in -1e5f32..1e5, fz in -1e5f32..1e5) {
            let mut p = Particle::new(1.0, Vec3::new(0.0, 1.0, 0.0)).with_max_speed(30.0);
            p.force = Vec3::new(fx, fy, fz);
            p.integrate(0.001).unwrap();
            prop_assert!(p.vel.length() <= 30.0 + 1e-3);
        }

        #[test]
        fn prop_ground_clamp_exact(y in 0.0f32..0.5, vy in -500.0f32..-1.0) {
            let mut p = Particle::new(1.0, Vec3::new(0.0, y, 0.0))
                .with_max_speed(1000.0)
                .with_velocity(Vec3::new(0.0, vy, 0.0));
            p.integrate(0.01).unwrap();
            if y + vy * 0.01 < 0.0 {
                prop_assert_eq!(p.pos.y, 0.0);
            }
            prop_assert!(p.pos.y >= 0.0);
        }
    }
}
