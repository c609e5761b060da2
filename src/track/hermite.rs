//! Piecewise cubic Hermite curves over a closed control-point loop
//!
//! The parameter range [0, 1] is split into `K - 1` equal segments for `K`
//! control points. Tangents are pre-scaled by the segment width so the unit
//! interval Hermite blend can be used per segment.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Step used by the finite-difference derivative fallback
pub const DERIVATIVE_STEP: f32 = 1e-4;

/// A parametric curve `t ∈ [0, 1] → Vec3`
pub trait Curve {
    /// Point on the curve at parameter `t`
    fn position(&self, t: f32) -> Vec3;

    /// Derivative with respect to `t`.
    ///
    /// Forward difference, switching to a backward difference at the end of
    /// the range where the forward sample would be clamped onto `t` itself.
    fn derivative(&self, t: f32) -> Vec3 {
        if t + DERIVATIVE_STEP <= 1.0 {
            (self.position(t + DERIVATIVE_STEP) - self.position(t)) / DERIVATIVE_STEP
        } else {
            (self.position(t) - self.position(t - DERIVATIVE_STEP)) / DERIVATIVE_STEP
        }
    }
}

impl<F> Curve for F
where
    F: Fn(f32) -> Vec3,
{
    fn position(&self, t: f32) -> Vec3 {
        self(t)
    }
}

/// Ordered (control point, tangent) pairs describing a Hermite curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HermiteSpec {
    pub points: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
}

impl HermiteSpec {
    pub fn new(points: Vec<Vec3>, tangents: Vec<Vec3>) -> Self {
        Self { points, tangents }
    }

    /// Append a control point with its tangent
    pub fn push(&mut self, point: Vec3, tangent: Vec3) {
        self.points.push(point);
        self.tangents.push(tangent);
    }

    /// True when the first and last control points coincide
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first.abs_diff_eq(*last, 1e-6),
            _ => false,
        }
    }

    /// Check the spec can be turned into a curve
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.points.len() != self.tangents.len() {
            return Err(SetupError::CurveLengthMismatch {
                points: self.points.len(),
                tangents: self.tangents.len(),
            });
        }
        if self.points.len() < 2 {
            return Err(SetupError::TooFewControlPoints(self.points.len()));
        }
        let bad = self
            .points
            .iter()
            .zip(&self.tangents)
            .position(|(p, t)| !p.is_finite() || !t.is_finite());
        if let Some(index) = bad {
            return Err(SetupError::NonFiniteControlPoint { index });
        }
        Ok(())
    }
}

/// Evaluator for a validated Hermite spec
#[derive(Debug, Clone, PartialEq)]
pub struct HermiteCurve {
    points: Vec<Vec3>,
    /// Tangents multiplied by the segment width `1 / (K - 1)`
    scaled_tangents: Vec<Vec3>,
    closed: bool,
}

impl HermiteCurve {
    /// Build a curve, failing fast on a malformed spec
    pub fn new(spec: &HermiteSpec) -> Result<Self, SetupError> {
        spec.validate()?;
        let width = 1.0 / (spec.points.len() - 1) as f32;
        Ok(Self {
            points: spec.points.clone(),
            scaled_tangents: spec.tangents.iter().map(|t| *t * width).collect(),
            closed: spec.is_closed(),
        })
    }

    pub fn control_points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Map any parameter into [0, 1]: values above 1 clip to 1, negative
    /// values wrap around the loop.
    pub fn normalize_param(t: f32) -> f32 {
        if t > 1.0 {
            1.0
        } else if t >= 0.0 {
            t
        } else if t.is_finite() {
            t.rem_euclid(1.0).min(1.0)
        } else {
            0.0
        }
    }

    /// Segment index `k` with `x(k) <= t <= x(k+1)` and the local parameter
    fn locate(&self, t: f32) -> (usize, f32) {
        let segments = self.segment_count();
        let x = Self::normalize_param(t) * segments as f32;
        let k = (x.floor() as usize).min(segments - 1);
        (k, x - k as f32)
    }
}

impl Curve for HermiteCurve {
    fn position(&self, t: f32) -> Vec3 {
        let (k, s) = self.locate(t);
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h10 = s3 - 2.0 * s2 + s;
        let h11 = s3 - s2;

        self.points[k] * h00
            + self.points[k + 1] * h01
            + self.scaled_tangents[k] * h10
            + self.scaled_tangents[k + 1] * h11
    }

    /// Exact derivative of the blend, chained through `ds/dt = K - 1`
    fn derivative(&self, t: f32) -> Vec3 {
        let (k, s) = self.locate(t);
        let s2 = s * s;

        let d00 = 6.0 * s2 - 6.0 * s;
        let d01 = -6.0 * s2 + 6.0 * s;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d11 = 3.0 * s2 - 2.0 * s;

        (self.points[k] * d00
            + self.points[k + 1] * d01
            + self.scaled_tangents[k] * d10
            + self.scaled_tangents[k + 1] * d11)
            * self.segment_count() as f32
    }
}

/// Rounded square loop around the origin, 10 units across, with a slight
/// rise on the far side. Used as the default race track.
pub fn square_loop() -> HermiteSpec {
    HermiteSpec::new(
        vec![
            Vec3::new(-5.0, -0.1, -5.0),
            Vec3::new(-5.0, 0.5, 5.0),
            Vec3::new(5.0, 0.5, 5.0),
            Vec3::new(5.0, 0.5, -5.0),
            Vec3::new(-5.0, -0.1, -5.0),
        ],
        vec![
            Vec3::new(-20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, -20.0),
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(-20.0, 0.0, 20.0),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints_hit_control_points() {
        let spec = square_loop();
        let curve = HermiteCurve::new(&spec).unwrap();
        assert!(curve.is_closed());
        assert_eq!(curve.position(0.0), spec.points[0]);
        assert_eq!(curve.position(1.0), spec.points[4]);
        assert_eq!(curve.position(0.25), spec.points[1]);
        assert_eq!(curve.position(0.5), spec.points[2]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut spec = square_loop();
        spec.tangents.pop();
        let err = HermiteCurve::new(&spec).unwrap_err();
        assert!(matches!(
            err,
            SetupError::CurveLengthMismatch {
                points: 5,
                tangents: 4
            }
        ));
    }

    #[test]
    fn test_single_point_rejected() {
        let spec = HermiteSpec::new(vec![Vec3::ZERO], vec![Vec3::X]);
        assert!(matches!(
            HermiteCurve::new(&spec),
            Err(SetupError::TooFewControlPoints(1))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut spec = square_loop();
        spec.tangents[2] = Vec3::new(f32::NAN, 0.0, 0.0);
        assert!(matches!(
            HermiteCurve::new(&spec),
            Err(SetupError::NonFiniteControlPoint { index: 2 })
        ));
    }

    #[test]
    fn test_negative_param_wraps() {
        let curve = HermiteCurve::new(&square_loop()).unwrap();
        let wrapped = curve.position(-0.25);
        assert!((wrapped - curve.position(0.75)).length() < 1e-4);
    }

    #[test]
    fn test_analytic_derivative_matches_difference() {
        let curve = HermiteCurve::new(&square_loop()).unwrap();
        let sampled = |t: f32| curve.position(t);
        for t in [0.1_f32, 0.3, 0.62, 0.9] {
            let exact = curve.derivative(t);
            let approx = sampled.derivative(t);
            assert!(
                (exact - approx).length() < exact.length() * 0.02,
                "t={t}: {exact} vs {approx}"
            );
        }
    }

    #[test]
    fn test_start_tangent_matches_spec() {
        let spec = square_loop();
        let curve = HermiteCurve::new(&spec).unwrap();
        let d = curve.derivative(0.0);
        assert!((d - spec.tangents[0]).length() < 1e-3);
        // End of the range uses the last segment, not a clamped zero
        assert!(curve.derivative(1.0).length() > 1.0);
    }

    #[test]
    fn test_closure_derivative_at_end_is_nonzero() {
        let line = |t: f32| Vec3::new(t.min(1.0) * 4.0, 0.0, 0.0);
        assert!((line.derivative(1.0).x - 4.0).abs() < 0.01);
    }

    proptest! {
        #[test]
        fn prop_params_above_one_clamp(t in 1.0f32..1000.0) {
            let curve = HermiteCurve::new(&square_loop()).unwrap();
            prop_assert_eq!(curve.position(t), curve.position(1.0));
        }

        #[test]
        fn prop_positions_stay_finite(t in -10.0f32..10.0) {
            let curve = HermiteCurve::new(&square_loop()).unwrap();
            prop_assert!(curve.position(t).is_finite());
        }
    }
}
