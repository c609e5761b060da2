//! Curve frames and the closest-point-on-curve solver

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::hermite::Curve;
use crate::WORLD_UP;

/// Local basis at a curve parameter.
///
/// - `tangent`: normalized curve derivative
/// - `horizontal`: `tangent × up`, points to the right of travel
/// - `normal`: `horizontal × tangent`, points up on level track
///
/// The same convention drives the mesh extrusion and the wall response, so
/// "left" is always a negative offset along `horizontal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub horizontal: Vec3,
    /// Curve point the frame is anchored at
    pub point: Vec3,
}

impl Frame {
    /// Frame at an explicit curve parameter
    pub fn at<C: Curve + ?Sized>(curve: &C, t: f32) -> Self {
        let tangent = curve.derivative(t).normalize_or_zero();
        let horizontal = tangent.cross(WORLD_UP).normalize_or_zero();
        let normal = horizontal.cross(tangent).normalize_or_zero();
        Self {
            tangent,
            normal,
            horizontal,
            point: curve.position(t),
        }
    }

    /// Frame at the sampled curve point nearest to `position`
    pub fn nearest<C: Curve + ?Sized>(curve: &C, position: Vec3, samples: usize) -> Self {
        Self::at(curve, time_on_curve(curve, position, samples))
    }

    /// Map a local (lateral, vertical, along) offset into world space
    #[inline]
    pub fn to_world(&self, lateral: f32, vertical: f32, along: f32) -> Vec3 {
        self.point + self.horizontal * lateral + self.normal * vertical + self.tangent * along
    }

    /// Rotate a local (lateral, vertical) direction into world space
    #[inline]
    pub fn direction(&self, lateral: f32, vertical: f32) -> Vec3 {
        (self.horizontal * lateral + self.normal * vertical).normalize_or_zero()
    }

    /// Signed distance of `position` from the anchor along `horizontal`.
    /// `horizontal` has no vertical component, so height is ignored.
    #[inline]
    pub fn lateral_offset(&self, position: Vec3) -> f32 {
        (position - self.point).dot(self.horizontal)
    }

    /// Basis as columns (tangent, normal, horizontal) for gizmo drawing
    pub fn basis(&self) -> [Vec3; 3] {
        [self.tangent, self.normal, self.horizontal]
    }
}

/// Parameter of the `i`-th of `samples` uniform scan points
#[inline]
pub fn sample_param(i: usize, samples: usize) -> f32 {
    i as f32 / samples as f32
}

/// Approximate nearest curve parameter to `position`.
///
/// Scans `samples` uniform parameters in [0, 1) and returns the one whose
/// curve point is closest. The first minimum wins, so the result is
/// deterministic and exact on the sampling grid; precision is `1 / samples`.
pub fn time_on_curve<C: Curve + ?Sized>(curve: &C, position: Vec3, samples: usize) -> f32 {
    let samples = samples.max(1);
    let mut best_t = 0.0;
    let mut best_dist = f32::INFINITY;
    for i in 0..samples {
        let t = sample_param(i, samples);
        let dist = position.distance_squared(curve.position(t));
        if dist < best_dist {
            best_dist = dist;
            best_t = t;
        }
    }
    best_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::hermite::{HermiteCurve, square_loop};

    #[test]
    fn test_frame_is_orthonormal() {
        let curve = HermiteCurve::new(&square_loop()).unwrap();
        for t in [0.0, 0.2, 0.55, 0.8] {
            let f = Frame::at(&curve, t);
            assert!((f.tangent.length() - 1.0).abs() < 1e-5);
            assert!((f.horizontal.length() - 1.0).abs() < 1e-5);
            assert!(f.tangent.dot(f.horizontal).abs() < 1e-5);
            assert!(f.normal.dot(f.tangent).abs() < 1e-5);
            assert_eq!(f.horizontal.y, 0.0);
        }
    }

    #[test]
    fn test_normal_points_up_on_flat_track() {
        let line = |t: f32| Vec3::new(t * 10.0, 0.0, 0.0);
        let f = Frame::at(&line, 0.5);
        assert!((f.normal - Vec3::Y).length() < 1e-4);
        // Travelling +X, right-hand side is +Z
        assert!((f.horizontal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_time_on_curve_grid_self_consistent() {
        let curve = HermiteCurve::new(&square_loop()).unwrap();
        for i in 0..64 {
            let t = sample_param(i, 64);
            assert_eq!(time_on_curve(&curve, curve.position(t), 64), t);
        }
    }

    #[test]
    fn test_first_minimum_wins() {
        // Both ends of a closed loop share a point; the seam maps to 0
        let curve = HermiteCurve::new(&square_loop()).unwrap();
        assert_eq!(time_on_curve(&curve, curve.position(1.0), 64), 0.0);
    }

    #[test]
    fn test_lateral_offset_sign() {
        let line = |t: f32| Vec3::new(t * 10.0, 0.0, 0.0);
        let f = Frame::nearest(&line, Vec3::new(5.0, 3.0, 2.0), 64);
        assert!((f.lateral_offset(Vec3::new(5.0, 3.0, 2.0)) - 2.0).abs() < 1e-4);
        assert!((f.lateral_offset(Vec3::new(5.0, 0.0, -1.5)) + 1.5).abs() < 1e-4);
    }
}
