//! Marble Racer headless runner
//!
//! Drives a race at a fixed frame rate with the throttle held and prints the
//! final body state. Usage: `marble-racer [config.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Marble Racer (native) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use marble_racer::leaderboard::format_time;
    use marble_racer::sim::InputFlags;
    use marble_racer::{RaceConfig, RaceError, build_race};

    const FRAME_DT: f32 = 1.0 / 60.0;
    const DEFAULT_SECONDS: f32 = 10.0;

    pub fn run() -> Result<(), RaceError> {
        let mut args = std::env::args().skip(1);
        let config = match args.next() {
            Some(path) => RaceConfig::from_path(path)?,
            None => RaceConfig::default(),
        };
        let seconds = args
            .next()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(DEFAULT_SECONDS);

        let mut race = build_race(&config)?;
        race.set_input(InputFlags {
            accelerate: true,
            ..Default::default()
        });

        let frames = (seconds / FRAME_DT).ceil() as u32;
        for frame in 0..frames {
            race.frame(FRAME_DT)?;
            if frame % 60 == 59 {
                let sim = &race.simulation;
                let player = &sim.bodies[race.player];
                log::info!(
                    "t={} phase={:?} player at {:.2?} speed {:.2} laps {}",
                    format_time(sim.race_time()),
                    sim.phase,
                    player.particle.pos,
                    player.particle.vel.length(),
                    sim.laps(race.player)
                );
            }
            if race.simulation.is_finished() {
                log::info!("All racers finished");
                break;
            }
        }

        for (rank, entry) in race.simulation.leaderboard.entries.iter().enumerate() {
            log::info!("{}. {} {}", rank + 1, entry.label, format_time(entry.race_time));
        }

        let snapshot = serde_json::to_string_pretty(&race.snapshot())
            .map_err(marble_racer::SetupError::from)?;
        println!("{}", snapshot);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `web::wasm_start`, this is just to satisfy the compiler
}
