//! Race setup
//!
//! Turns a `RaceConfig` into a ready-to-run race: track curve and mesh,
//! player car, AI enemies on their own racing lines, wall contacts and the
//! finish gate.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::WORLD_UP;
use crate::config::{EnemyConfig, RaceConfig};
use crate::error::{RaceError, SetupError};
use crate::horizontal;
use crate::sim::{
    Body, BodySnapshot, Car, CurveId, Enemy, FinishLine, FixedStepper, InputFlags, Particle,
    Simulation, WallContact,
};
use crate::track::{Curve, Frame, HermiteCurve, HermiteSpec, TrackMesh};

/// A running race: simulation, static track mesh and frame clock
#[derive(Debug, Clone)]
pub struct Race {
    pub simulation: Simulation,
    pub track: TrackMesh,
    pub stepper: FixedStepper,
    /// Index of the player body
    pub player: usize,
    /// Handle of the main track curve
    pub track_curve: CurveId,
}

impl Race {
    /// Advance by one rendered frame. Returns the number of ticks taken.
    pub fn frame(&mut self, frame_dt: f32) -> Result<u32, RaceError> {
        Ok(self.stepper.advance(&mut self.simulation, frame_dt)?)
    }

    pub fn set_input(&mut self, input: InputFlags) {
        self.simulation.set_input(input);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.simulation.set_paused(paused);
        if paused {
            self.stepper.reset();
        }
    }

    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.simulation.snapshot()
    }
}

/// Build a race from configuration
pub fn build_race(config: &RaceConfig) -> Result<Race, SetupError> {
    config.validate()?;

    let curve = HermiteCurve::new(&config.track.curve)?;
    let track = TrackMesh::build(config.track.profile, &curve, config.track.slices)?;

    let physics = &config.physics;
    let mut simulation = Simulation::new(physics.gravity, physics.timestep)
        .with_friction(physics.u_static, physics.u_kinetic)
        .with_countdown(physics.countdown)
        .with_wall_spring(config.track.wall_ks, config.track.wall_kd)
        .with_scan_samples(physics.scan_samples);

    let start = Frame::at(&curve, HermiteCurve::normalize_param(config.race.finish_param));
    let track_width = config.track.profile.width;
    let track_curve = simulation.add_curve(curve);

    let p = &config.player;
    let particle = Particle::new(p.mass, on_ground(start.point))
        .with_max_speed(p.max_speed)
        .with_scale(Vec3::splat(p.scale));
    let car = Car {
        thrust: p.thrust,
        brake: p.brake,
        turn_rate: p.turn_rate,
        grip_scale: p.grip_scale,
        ..Car::new(start.tangent)
    };
    let player = simulation.add_body(Body::player(p.label.clone(), particle, car))?;
    simulation.add_wall_contact(WallContact {
        body: player,
        curve: track_curve,
        track_width,
        car_width: p.width,
    })?;

    let mut rng = Pcg32::seed_from_u64(config.race.seed);
    for enemy in &config.enemies {
        let index = add_enemy(&mut simulation, config, enemy, &mut rng)?;
        simulation.add_wall_contact(WallContact {
            body: index,
            curve: track_curve,
            track_width,
            car_width: enemy.width,
        })?;
    }

    let gate = FinishLine::new(
        start.point,
        start.tangent,
        track_width / 2.0 + config.track.profile.wall_width + config.race.gate_margin,
    );
    simulation.set_finish_line(gate, config.race.lap_goal);

    log::info!(
        "Race ready: {} bodies, {} track vertices, {} laps",
        simulation.bodies.len(),
        track.vertex_count(),
        config.race.lap_goal
    );

    let stepper = FixedStepper::new(physics.timestep).with_max_frame_dt(physics.max_frame_dt);
    Ok(Race {
        simulation,
        track,
        stepper,
        player,
        track_curve,
    })
}

fn add_enemy(
    simulation: &mut Simulation,
    config: &RaceConfig,
    enemy: &EnemyConfig,
    rng: &mut Pcg32,
) -> Result<usize, SetupError> {
    let line = racing_line(&config.track.curve, enemy.lane_offset, enemy.path_jitter, rng);
    let path = HermiteCurve::new(&line)?;

    let t = HermiteCurve::normalize_param(config.race.finish_param - enemy.start_offset);
    let pos = on_ground(path.position(t));
    let heading = horizontal(path.derivative(t));

    let path_id = simulation.add_curve(path);
    let particle = Particle::new(enemy.mass, pos)
        .with_max_speed(enemy.max_speed)
        .with_scale(Vec3::splat(enemy.scale));
    let mut ai = Enemy::new(path_id, enemy.thrust, enemy.seek_gain);
    if heading != Vec3::ZERO {
        ai.forward = heading;
    }
    simulation.add_body(Body::enemy(enemy.label.clone(), particle, ai))
}

/// Shift every control point sideways by `lane_offset` plus a random amount
/// up to `jitter`. Tangents are kept. A closed loop stays closed.
pub fn racing_line(
    spec: &HermiteSpec,
    lane_offset: f32,
    jitter: f32,
    rng: &mut impl Rng,
) -> HermiteSpec {
    let closed = spec.is_closed();
    let mut line = HermiteSpec::default();
    for (point, tangent) in spec.points.iter().zip(&spec.tangents) {
        let side = horizontal(tangent.cross(WORLD_UP));
        let noise = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        line.push(*point + side * (lane_offset + noise), *tangent);
    }
    let n = line.points.len();
    if closed && n > 1 {
        line.points[n - 1] = line.points[0];
    }
    line
}

fn on_ground(point: Vec3) -> Vec3 {
    Vec3::new(point.x, point.y.max(0.0), point.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RacePhase;
    use crate::track::{TrackProfile, sample_param, square_loop, time_on_curve};

    #[test]
    fn test_square_track_scenario() {
        let mut config = RaceConfig::default();
        config.track.profile = TrackProfile {
            width: 10.0,
            wall_width: 0.8,
            wall_height: 0.4,
            road_thickness: 0.1,
        };
        let race = build_race(&config).unwrap();
        assert_eq!(race.track.vertex_count(), 520);
        assert!(race.track.triangle_count() > 0);

        let curve = race.simulation.curve(race.track_curve).unwrap();
        for i in 0..64 {
            let t = sample_param(i, 64);
            assert_eq!(time_on_curve(curve, curve.position(t), 64), t);
        }
    }

    #[test]
    fn test_default_race_layout() {
        let race = build_race(&RaceConfig::default()).unwrap();
        let sim = &race.simulation;
        assert_eq!(sim.bodies.len(), 3);
        assert_eq!(race.player, 0);
        assert_eq!(sim.wall_contacts.len(), 3);
        assert_eq!(sim.lap_goal, 3);
        assert_eq!(sim.phase, RacePhase::Countdown);
        assert!(sim.bodies.iter().all(|b| b.particle.pos.y >= 0.0));
        // Track plus one racing line per enemy
        assert!(sim.curve(CurveId(2)).is_some());
    }

    #[test]
    fn test_racing_line_stays_closed() {
        let mut rng = Pcg32::seed_from_u64(7);
        let line = racing_line(&square_loop(), 0.3, 0.2, &mut rng);
        assert!(line.is_closed());
        assert_eq!(line.points.len(), 5);
        assert!(HermiteCurve::new(&line).is_ok());
    }

    #[test]
    fn test_racing_line_offsets_sideways() {
        let mut rng = Pcg32::seed_from_u64(7);
        let spec = square_loop();
        let line = racing_line(&spec, 0.5, 0.0, &mut rng);
        for (a, b) in spec.points.iter().zip(&line.points) {
            assert!(((*b - *a).length() - 0.5).abs() < 1e-5);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn test_racing_line_is_seeded() {
        let spec = square_loop();
        let a = racing_line(&spec, 0.0, 0.3, &mut Pcg32::seed_from_u64(42));
        let b = racing_line(&spec, 0.0, 0.3, &mut Pcg32::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config_fails_setup() {
        let mut config = RaceConfig::default();
        config.track.curve.tangents.pop();
        let err: RaceError = build_race(&config).unwrap_err().into();
        assert!(err.to_string().starts_with("setup error"));
    }

    #[test]
    fn test_countdown_then_cars_move() {
        let mut race = build_race(&RaceConfig::default()).unwrap();
        race.set_input(InputFlags {
            accelerate: true,
            ..Default::default()
        });
        let start = race.snapshot();

        // 2.5 s at 60 fps: still counting down
        for _ in 0..150 {
            race.frame(1.0 / 60.0).unwrap();
        }
        assert_eq!(race.snapshot(), start);

        for _ in 0..60 {
            race.frame(1.0 / 60.0).unwrap();
        }
        assert_eq!(race.simulation.phase, RacePhase::Racing);
        let now = race.snapshot();
        for (before, after) in start.iter().zip(&now) {
            assert_ne!(before.position, after.position, "{} did not move", after.label);
        }
    }

    #[test]
    fn test_player_stays_on_track_for_a_while() {
        let mut config = RaceConfig::default();
        config.physics.countdown = 0.0;
        let mut race = build_race(&config).unwrap();
        race.set_input(InputFlags {
            accelerate: true,
            ..Default::default()
        });
        for _ in 0..60 {
            race.frame(1.0 / 60.0).unwrap();
        }
        let player = &race.simulation.bodies[race.player].particle;
        assert!(player.pos.is_finite());
        assert!(player.vel.length() <= config.player.max_speed + 1e-3);
        let curve = race.simulation.curve(race.track_curve).unwrap();
        let frame = Frame::nearest(curve, player.pos, 64);
        assert!(frame.lateral_offset(player.pos).abs() < config.track.profile.width);
    }
}
