//! Track mesh extrusion
//!
//! A fixed eight-point cross-section (two walls and the road between them)
//! is swept along the track curve. The presentation layer uploads the vertex
//! and index buffers as-is; the per-slice frames are kept for collision
//! queries and debug gizmos.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::frame::Frame;
use super::hermite::Curve;
use crate::consts::MIN_TRACK_SLICES;
use crate::error::SetupError;

/// Points in one cross-section
pub const SECTION_POINTS: usize = 8;

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Per-point normals in local (lateral, vertical) coordinates, indexed like
/// the cross-section points. Assigned per slice, not derived from the mesh.
const SECTION_NORMALS: [(f32, f32); SECTION_POINTS] = [
    (-DIAG, -DIAG),
    (-DIAG, DIAG),
    (DIAG, DIAG),
    (DIAG, DIAG),
    (-DIAG, DIAG),
    (-DIAG, DIAG),
    (DIAG, DIAG),
    (DIAG, -DIAG),
];

/// Track cross-section dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackProfile {
    /// Drivable width between the inner wall faces
    pub width: f32,
    pub wall_width: f32,
    pub wall_height: f32,
    pub road_thickness: f32,
}

impl TrackProfile {
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(self.width > 0.0) {
            return Err(SetupError::invalid("track width", "must be positive"));
        }
        if !(self.wall_width >= 0.0) || !(self.wall_height >= 0.0) || !(self.road_thickness >= 0.0)
        {
            return Err(SetupError::invalid(
                "track wall dimensions",
                "must be non-negative",
            ));
        }
        Ok(())
    }

    /// Cross-section in local (lateral, vertical) coordinates.
    ///
    /// Order: outer wall base, outer wall top, inner wall top, road edge on
    /// the left, then mirrored on the right. The polygon closes along the
    /// underside from the last point back to the first.
    pub fn section(&self) -> [(f32, f32); SECTION_POINTS] {
        let half = self.width / 2.0;
        let outer = half + self.wall_width;
        let top = self.wall_height;
        let base = -self.road_thickness;
        [
            (-outer, base),
            (-outer, top),
            (-half, top),
            (-half, 0.0),
            (half, 0.0),
            (half, top),
            (outer, top),
            (outer, base),
        ]
    }
}

/// GPU-ready track vertex
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TrackVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl TrackVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// One extrusion slice: curve point plus its local basis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSlice {
    pub t: f32,
    pub frame: Frame,
}

/// Extruded track geometry, read-only after construction
#[derive(Debug, Clone)]
pub struct TrackMesh {
    pub profile: TrackProfile,
    pub vertices: Vec<TrackVertex>,
    pub indices: Vec<u32>,
    pub slices: Vec<TrackSlice>,
    closed: bool,
}

impl TrackMesh {
    /// Sweep the profile along `curve` at `slice_count + 1` slices
    pub fn build<C: Curve + ?Sized>(
        profile: TrackProfile,
        curve: &C,
        slice_count: usize,
    ) -> Result<Self, SetupError> {
        profile.validate()?;
        if slice_count < MIN_TRACK_SLICES {
            return Err(SetupError::TooFewSlices {
                got: slice_count,
                min: MIN_TRACK_SLICES,
            });
        }

        let section = profile.section();
        let closed = curve.position(0.0).abs_diff_eq(curve.position(1.0), 1e-5);

        let mut vertices = Vec::with_capacity((slice_count + 1) * SECTION_POINTS);
        let mut slices = Vec::with_capacity(slice_count + 1);
        for slice in 0..=slice_count {
            let t = slice as f32 / slice_count as f32;
            let frame = Frame::at(curve, t);
            for (&(lateral, vertical), &(nl, nv)) in section.iter().zip(&SECTION_NORMALS) {
                vertices.push(TrackVertex::new(
                    frame.to_world(lateral, vertical, 0.0),
                    frame.direction(nl, nv),
                ));
            }
            slices.push(TrackSlice { t, frame });
        }

        // Closed loops wrap the last ring of quads onto slice 0; the seam
        // slice is still emitted above for position data.
        let mut indices = Vec::with_capacity(slice_count * SECTION_POINTS * 6);
        for slice in 0..slice_count {
            let next = if closed && slice + 1 == slice_count {
                0
            } else {
                slice + 1
            };
            let ring = (slice * SECTION_POINTS) as u32;
            let next_ring = (next * SECTION_POINTS) as u32;
            for j in 0..SECTION_POINTS {
                let k = (j + 1) % SECTION_POINTS;
                let a = ring + j as u32;
                let b = ring + k as u32;
                let c = next_ring + j as u32;
                let d = next_ring + k as u32;
                indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }

        log::info!(
            "Built track mesh: {} slices, {} vertices, {} triangles (closed: {})",
            slice_count,
            vertices.len(),
            indices.len() / 3,
            closed
        );

        Ok(Self {
            profile,
            vertices,
            indices,
            slices,
            closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex bytes for a GPU upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Interleaved positions and normals as plain floats
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Per-slice (point, basis) pairs
    pub fn slice_bases(&self) -> impl Iterator<Item = (Vec3, [Vec3; 3])> + '_ {
        self.slices.iter().map(|s| (s.frame.point, s.frame.basis()))
    }
}
