//! Track geometry
//!
//! Everything here is built once from static control points and is
//! immutable afterwards:
//! - `hermite`: closed-loop Hermite curve evaluation
//! - `frame`: closest-point search and local curve frames
//! - `mesh`: cross-section extrusion into a triangle mesh

pub mod frame;
pub mod hermite;
pub mod mesh;

pub use frame::{Frame, sample_param, time_on_curve};
pub use hermite::{Curve, HermiteCurve, HermiteSpec, square_loop};
pub use mesh::{SECTION_POINTS, TrackMesh, TrackProfile, TrackSlice, TrackVertex};
