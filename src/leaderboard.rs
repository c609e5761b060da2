//! Race leaderboard
//!
//! Finish records ordered by race time, fastest first.

use serde::{Deserialize, Serialize};

/// A single finish entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishRecord {
    /// Index of the body in the simulation
    pub body: usize,
    pub label: String,
    /// Seconds since the countdown ended
    pub race_time: f32,
    pub laps: u32,
}

/// Finish order for one race
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<FinishRecord>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a record and return its rank (1-indexed).
    /// Ties keep arrival order.
    pub fn record(&mut self, entry: FinishRecord) -> usize {
        let pos = self
            .entries
            .iter()
            .position(|e| entry.race_time < e.race_time);
        match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        }
    }

    /// Whether a body already has a finish record
    pub fn contains(&self, body: usize) -> bool {
        self.entries.iter().any(|e| e.body == body)
    }

    /// Rank of a body (1-indexed)
    pub fn rank_of(&self, body: usize) -> Option<usize> {
        self.entries.iter().position(|e| e.body == body).map(|i| i + 1)
    }

    pub fn winner(&self) -> Option<&FinishRecord> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format seconds as `MM:SS:mmm`
pub fn format_time(seconds: f32) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).floor() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:03}", minutes, secs, millis)
}
