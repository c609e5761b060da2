//! Track wall contact: keeps a body between the walls of a curve

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::particle::Particle;
use super::spring::spring_damper_force;
use super::state::CurveId;
use crate::track::{Curve, Frame};

/// Which wall a body is touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
}

impl WallSide {
    /// Side from a signed offset along the frame's `horizontal` axis
    #[inline]
    pub fn from_offset(offset: f32) -> Self {
        if offset < 0.0 { Self::Left } else { Self::Right }
    }

    /// Sign of the outward wall normal along `horizontal`
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Binds a body to a curve's walls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallContact {
    pub body: usize,
    pub curve: CurveId,
    pub track_width: f32,
    pub car_width: f32,
}

/// Result of a wall check for one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub side: WallSide,
    /// How far the body's edge sits beyond the wall
    pub penetration: f32,
    pub force: Vec3,
}

impl WallContact {
    /// Check the body against both walls.
    ///
    /// The body is in contact once its edge reaches a wall, i.e. when
    /// `|offset| >= (track_width - car_width) / 2`. The response is a
    /// spring-damper between the body's edge point and its lateral
    /// projection onto the wall; the wall point is static.
    pub fn check<C: Curve + ?Sized>(
        &self,
        curve: &C,
        particle: &Particle,
        samples: usize,
        ks: f32,
        kd: f32,
    ) -> Option<WallHit> {
        let frame = Frame::nearest(curve, particle.pos, samples);
        let offset = frame.lateral_offset(particle.pos);
        let half_width = self.track_width * 0.5;
        let car_half = self.car_width * 0.5;

        if offset.abs() < half_width - car_half {
            return None;
        }

        let side = WallSide::from_offset(offset);
        let wall_normal = frame.horizontal * side.sign();
        let penetration = offset.abs() + car_half - half_width;
        let car_contact = particle.pos + wall_normal * car_half;
        let wall_contact = car_contact - wall_normal * penetration;

        let force = spring_damper_force(
            car_contact,
            wall_contact,
            particle.vel,
            Vec3::ZERO,
            ks,
            kd,
            0.0,
        );
        Some(WallHit {
            side,
            penetration,
            force,
        })
    }
}
