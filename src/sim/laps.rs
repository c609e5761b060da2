//! Finish gate and per-body lap counting

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::horizontal;

/// Direction of a gate crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Forward,
    Backward,
}

/// A vertical gate across the track.
///
/// `direction` is the direction of travel; the line itself runs along the
/// horizontal perpendicular through `position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishLine {
    pub position: Vec3,
    pub direction: Vec3,
    pub half_width: f32,
}

impl FinishLine {
    pub fn new(position: Vec3, direction: Vec3, half_width: f32) -> Self {
        Self {
            position,
            direction: horizontal(direction),
            half_width,
        }
    }

    /// Distance ahead of the line (negative behind it)
    #[inline]
    pub fn signed_distance(&self, pos: Vec3) -> f32 {
        (pos - self.position).dot(self.direction)
    }

    /// Whether `pos` lies within the gate's lateral extent
    pub fn within_gate(&self, pos: Vec3) -> bool {
        let rel = pos - self.position;
        let along = self.direction * rel.dot(self.direction);
        let lateral = Vec3::new(rel.x - along.x, 0.0, rel.z - along.z);
        lateral.length() <= self.half_width
    }

    /// Classify the move from `prev` to `now`. Sitting exactly on the line
    /// counts as being past it.
    pub fn crossing(&self, prev: Vec3, now: Vec3) -> Option<Crossing> {
        if !self.within_gate(now) {
            return None;
        }
        let before = self.signed_distance(prev);
        let after = self.signed_distance(now);
        if before < 0.0 && after >= 0.0 {
            Some(Crossing::Forward)
        } else if before >= 0.0 && after < 0.0 {
            Some(Crossing::Backward)
        } else {
            None
        }
    }
}

/// Net gate crossings for one body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LapTracker {
    crossings: i32,
    pub finished: bool,
}

impl LapTracker {
    /// A body that starts behind the line does not score its first crossing
    pub fn new(line: &FinishLine, start: Vec3) -> Self {
        let behind = line.within_gate(start) && line.signed_distance(start) < 0.0;
        Self {
            crossings: if behind { -1 } else { 0 },
            finished: false,
        }
    }

    /// Apply a crossing, returning the lap count when a lap was completed
    pub fn record(&mut self, crossing: Crossing) -> Option<u32> {
        match crossing {
            Crossing::Forward => {
                self.crossings += 1;
                (self.crossings > 0).then(|| self.laps())
            }
            Crossing::Backward => {
                self.crossings -= 1;
                None
            }
        }
    }

    /// Completed laps, never negative
    #[inline]
    pub fn laps(&self) -> u32 {
        self.crossings.max(0) as u32
    }
}
