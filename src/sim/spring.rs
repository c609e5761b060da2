//! Damped springs between two bodies, and the shared spring-damper law

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::particle::Particle;

/// Spring-damper force acting on `i`, pulling it toward `j`.
///
/// `fs = ks * (|xj - xi| - rest)` and `fd = kd * ((vj - vi) · d̂)`, both along
/// the unit direction `d̂` from `i` to `j`. Coincident points yield zero.
pub fn spring_damper_force(
    xi: Vec3,
    xj: Vec3,
    vi: Vec3,
    vj: Vec3,
    ks: f32,
    kd: f32,
    rest_length: f32,
) -> Vec3 {
    let d = xj - xi;
    let dir = d.normalize_or_zero();
    let spring = dir * (ks * (d.length() - rest_length));
    let damping = dir * (kd * (vj - vi).dot(dir));
    spring + damping
}

/// A spring linking two bodies by index (the simulation owns the bodies)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub a: usize,
    pub b: usize,
    pub ks: f32,
    pub kd: f32,
    pub rest_length: f32,
}

impl Spring {
    /// Force on `a`; `b` receives the negation
    pub fn force(&self, a: &Particle, b: &Particle) -> Vec3 {
        spring_damper_force(a.pos, b.pos, a.vel, b.vel, self.ks, self.kd, self.rest_length)
    }
}
