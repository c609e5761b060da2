//! Browser bindings
//!
//! The JS presentation layer owns rendering, camera and key bindings. It
//! feeds frame deltas and input flags in and reads flat buffers back out.

use wasm_bindgen::prelude::*;

use crate::config::RaceConfig;
use crate::error::RaceError;
use crate::setup::{Race, build_race};
use crate::sim::InputFlags;

/// Floats per body in `body_state`: x, y, z, rotation, collided, laps
pub const BODY_STRIDE: usize = 6;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger already installed by an earlier module instance
        return;
    }
    log::info!("Marble Racer core loaded");
}

fn to_js(err: RaceError) -> JsValue {
    log::error!("{}", err);
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WasmRace {
    race: Race,
}

#[wasm_bindgen]
impl WasmRace {
    /// Build a race from an optional JSON config (defaults when absent)
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmRace, JsValue> {
        let config = match config_json {
            Some(json) => RaceConfig::from_json(&json).map_err(|e| to_js(e.into()))?,
            None => RaceConfig::default(),
        };
        let race = build_race(&config).map_err(|e| to_js(e.into()))?;
        Ok(WasmRace { race })
    }

    pub fn set_input(&mut self, accelerate: bool, brake: bool, left: bool, right: bool) {
        self.race.set_input(InputFlags {
            accelerate,
            brake,
            left,
            right,
        });
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.race.set_paused(paused);
    }

    /// Advance by one rendered frame; returns the ticks taken
    pub fn frame(&mut self, dt: f32) -> Result<u32, JsValue> {
        self.race.frame(dt).map_err(to_js)
    }

    pub fn body_count(&self) -> usize {
        self.race.simulation.bodies.len()
    }

    pub fn player_index(&self) -> usize {
        self.race.player
    }

    /// Flat per-body state, `BODY_STRIDE` floats each
    pub fn body_state(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.body_count() * BODY_STRIDE);
        for snap in self.race.snapshot() {
            out.extend_from_slice(&snap.position);
            out.push(snap.rotation);
            out.push(if snap.collided { 1.0 } else { 0.0 });
            out.push(snap.laps as f32);
        }
        out
    }

    /// Interleaved position/normal floats
    pub fn track_vertices(&self) -> Vec<f32> {
        self.race.track.vertex_floats().to_vec()
    }

    pub fn track_indices(&self) -> Vec<u32> {
        self.race.track.indices.clone()
    }

    pub fn race_time(&self) -> f32 {
        self.race.simulation.race_time()
    }

    pub fn countdown_remaining(&self) -> f32 {
        self.race.simulation.countdown_remaining()
    }

    pub fn is_finished(&self) -> bool {
        self.race.simulation.is_finished()
    }

    pub fn leaderboard_json(&self) -> String {
        self.race
            .simulation
            .leaderboard
            .to_json()
            .unwrap_or_else(|_| "{\"entries\":[]}".to_string())
    }
}
