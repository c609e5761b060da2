//! Fixed timestep simulation tick
//!
//! Every force (base friction, driver input, pairwise contact, walls,
//! springs) is accumulated for all bodies before any body is integrated, so
//! the result does not depend on body order within a tick.

use serde::{Deserialize, Serialize};

use super::body::BodyKind;
use super::particle::collide_pair;
use super::state::{RacePhase, Simulation};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS};
use crate::error::SimError;
use crate::leaderboard::FinishRecord;

/// Driver input held during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFlags {
    pub accelerate: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

impl InputFlags {
    /// Whether any key is held
    #[inline]
    pub fn any(&self) -> bool {
        self.accelerate || self.brake || self.left || self.right
    }
}

impl Simulation {
    /// Advance the simulation by one fixed step
    pub fn update(&mut self, dt: f32) -> Result<(), SimError> {
        tick(self, dt)
    }
}

/// Advance the simulation state by one fixed timestep
pub fn tick(sim: &mut Simulation, dt: f32) -> Result<(), SimError> {
    if sim.paused {
        return Ok(());
    }

    sim.elapsed += f64::from(dt);
    if sim.elapsed < f64::from(sim.countdown) {
        return Ok(());
    }
    if sim.phase == RacePhase::Countdown {
        sim.phase = RacePhase::Racing;
        log::info!("Race started");
    }

    apply_forces(sim)?;
    apply_contacts(sim);
    apply_walls(sim)?;
    apply_springs(sim);
    integrate(sim, dt)?;
    update_laps(sim);

    sim.ticks += 1;
    Ok(())
}

fn apply_forces(sim: &mut Simulation) -> Result<(), SimError> {
    let gravity = sim.gravity;
    let input = sim.input;
    let curves = &sim.curves;

    for (i, body) in sim.bodies.iter_mut().enumerate() {
        let label = &body.label;
        let particle = &mut body.particle;
        let result = match &mut body.kind {
            BodyKind::Plain => particle.apply_base_forces(gravity, sim.u_kinetic).map(|_| ()),
            BodyKind::PlayerCar(car) => {
                car.apply_inputs(particle, &input, gravity, sim.u_static, sim.u_kinetic)
            }
            BodyKind::AiEnemy(enemy) => match curves.get(enemy.path.0) {
                Some(path) => {
                    enemy.apply_inputs(particle, path, sim.scan_samples, gravity, sim.u_kinetic)
                }
                None => Err(SimError::MissingCurve(enemy.path.0)),
            },
        };
        result.inspect_err(|e| log::error!("Body {} '{}': {}", i, label, e))?;
    }
    Ok(())
}

/// Pairwise contact, each unordered pair once
fn apply_contacts(sim: &mut Simulation) {
    let n = sim.bodies.len();
    for i in 0..n {
        let (head, tail) = sim.bodies.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            collide_pair(&mut a.particle, &mut b.particle);
        }
    }
}

fn apply_walls(sim: &mut Simulation) -> Result<(), SimError> {
    for body in &mut sim.bodies {
        body.set_collided(false);
    }
    for contact in &sim.wall_contacts {
        let curve = sim
            .curves
            .get(contact.curve.0)
            .ok_or(SimError::MissingCurve(contact.curve.0))?;
        let Some(body) = sim.bodies.get_mut(contact.body) else {
            continue;
        };
        if let Some(hit) = contact.check(
            curve,
            &body.particle,
            sim.scan_samples,
            sim.wall_ks,
            sim.wall_kd,
        ) {
            body.particle.add_force(hit.force);
            body.set_collided(true);
        }
    }
    Ok(())
}

fn apply_springs(sim: &mut Simulation) {
    for spring in &sim.springs {
        let (Some(a), Some(b)) = (sim.bodies.get(spring.a), sim.bodies.get(spring.b)) else {
            continue;
        };
        let force = spring.force(&a.particle, &b.particle);
        sim.bodies[spring.a].particle.add_force(force);
        sim.bodies[spring.b].particle.add_force(-force);
    }
}

fn integrate(sim: &mut Simulation, dt: f32) -> Result<(), SimError> {
    let input = sim.input;
    for (i, body) in sim.bodies.iter_mut().enumerate() {
        let label = &body.label;
        body.particle
            .integrate(dt)
            .inspect_err(|e| log::error!("Body {} '{}': {}", i, label, e))?;
        match &mut body.kind {
            BodyKind::Plain => {}
            BodyKind::PlayerCar(car) => car.steer(&input, dt),
            BodyKind::AiEnemy(enemy) => enemy.follow_velocity(&body.particle),
        }
    }
    Ok(())
}

fn update_laps(sim: &mut Simulation) {
    let Some(line) = sim.finish_line else {
        return;
    };
    let race_time = sim.race_time();

    for (i, body) in sim.bodies.iter().enumerate() {
        if !body.is_racer() {
            continue;
        }
        let Some(tracker) = sim.laps.get_mut(i) else {
            continue;
        };
        if tracker.finished {
            continue;
        }
        let now = body.particle.pos;
        let prev = now - body.particle.delta_pos;
        let Some(crossing) = line.crossing(prev, now) else {
            continue;
        };
        let Some(lap) = tracker.record(crossing) else {
            log::debug!("'{}' crossed the line {:?}", body.label, crossing);
            continue;
        };
        log::info!("'{}' completed lap {} at {:.3}s", body.label, lap, race_time);

        if sim.lap_goal > 0 && lap >= sim.lap_goal {
            tracker.finished = true;
            let rank = sim.leaderboard.record(FinishRecord {
                body: i,
                label: body.label.clone(),
                race_time,
                laps: lap,
            });
            log::info!("'{}' finished in position {}", body.label, rank);
        }
    }

    if sim.phase == RacePhase::Racing && sim.lap_goal > 0 {
        let mut racers = sim
            .bodies
            .iter()
            .zip(&sim.laps)
            .filter(|(b, _)| b.is_racer())
            .peekable();
        if racers.peek().is_some() && racers.all(|(_, t)| t.finished) {
            sim.phase = RacePhase::Finished;
            log::info!("Race finished at {:.3}s", race_time);
        }
    }
}

/// Fixed-step accumulator: turns variable frame deltas into whole ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepper {
    pub timestep: f32,
    /// Largest frame delta accepted in one call
    pub max_frame_dt: f32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(timestep: f32) -> Self {
        Self {
            timestep,
            max_frame_dt: MAX_FRAME_DT,
            accumulator: 0.0,
        }
    }

    pub fn with_max_frame_dt(mut self, max_frame_dt: f32) -> Self {
        self.max_frame_dt = max_frame_dt;
        self
    }

    /// Unconsumed time carried to the next frame
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Feed one frame delta and run the ticks it covers.
    /// Returns the number of ticks taken.
    pub fn advance(&mut self, sim: &mut Simulation, frame_dt: f32) -> Result<u32, SimError> {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= self.timestep && substeps < MAX_SUBSTEPS {
            sim.update(self.timestep)?;
            self.accumulator -= self.timestep;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= self.timestep {
            log::warn!(
                "Dropping {:.4}s of simulation time after {} substeps",
                self.accumulator,
                substeps
            );
            self.accumulator = 0.0;
        }
        Ok(substeps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::{Body, Car, FinishLine, Particle, Spring, WallContact};
    use crate::track::hermite::square_loop;
    use crate::track::{Frame, HermiteCurve};
    use glam::Vec3;

    const G: Vec3 = Vec3::new(0.0, -9.8, 0.0);

    fn racing_sim() -> Simulation {
        Simulation::new(G, SIM_DT).with_countdown(0.0)
    }

    fn accelerate() -> InputFlags {
        InputFlags {
            accelerate: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_resting_car_stays_put() {
        let mut sim = racing_sim();
        let start = Vec3::new(1.0, 0.0, 2.0);
        sim.add_body(Body::player("p", Particle::new(1.0, start), Car::new(Vec3::X)))
            .unwrap();
        sim.update(SIM_DT).unwrap();
        assert_eq!(sim.bodies[0].particle.vel, Vec3::ZERO);
        assert_eq!(sim.bodies[0].particle.pos, start);
    }

    #[test]
    fn test_centered_car_never_touches_walls() {
        let mut sim = racing_sim();
        let spec = crate::track::HermiteSpec::new(
            vec![Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0)],
            vec![Vec3::new(1000.0, 0.0, 0.0), Vec3::new(1000.0, 0.0, 0.0)],
        );
        let curve = HermiteCurve::new(&spec).unwrap();
        let frame = Frame::at(&curve, 0.0);
        let id = sim.add_curve(curve);

        let start = Vec3::new(frame.point.x, 0.0, frame.point.z);
        let body = sim
            .add_body(Body::player(
                "p",
                Particle::new(1.0, start),
                Car::new(frame.tangent),
            ))
            .unwrap();
        sim.add_wall_contact(WallContact {
            body,
            curve: id,
            track_width: 10.0,
            car_width: 0.4,
        })
        .unwrap();
        sim.set_input(accelerate());

        // 5 s of full throttle
        for _ in 0..5000 {
            sim.update(SIM_DT).unwrap();
            assert!(!sim.bodies[body].collided());
        }
        let pos = sim.bodies[body].particle.pos;
        assert!(pos.distance(start) > 20.0);
        assert!(pos.z.abs() < 1e-3);
    }

    #[test]
    fn test_displaced_car_is_pushed_back() {
        let mut sim = racing_sim();
        let spec = crate::track::HermiteSpec::new(
            vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)],
            vec![Vec3::new(100.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0)],
        );
        let id = sim.add_curve(HermiteCurve::new(&spec).unwrap());

        sim.add_body(Body::player(
            "p",
            Particle::new(1.0, Vec3::new(50.0, 0.0, 0.95)),
            Car::new(Vec3::X),
        ))
        .unwrap();
        sim.add_wall_contact(WallContact {
            body: 0,
            curve: id,
            track_width: 2.0,
            car_width: 0.4,
        })
        .unwrap();
        sim.set_input(accelerate());
        sim.update(SIM_DT).unwrap();
        assert!(sim.bodies[0].collided());
        assert!(sim.bodies[0].particle.vel.z < 0.0);
    }

    #[test]
    fn test_countdown_holds_cars() {
        let mut sim = Simulation::new(G, SIM_DT).with_countdown(0.01);
        sim.add_body(Body::player("p", Particle::new(1.0, Vec3::ZERO), Car::new(Vec3::X)))
            .unwrap();
        sim.set_input(accelerate());

        for _ in 0..9 {
            sim.update(SIM_DT).unwrap();
        }
        assert_eq!(sim.phase, RacePhase::Countdown);
        assert_eq!(sim.bodies[0].particle.pos, Vec3::ZERO);

        for _ in 0..3 {
            sim.update(SIM_DT).unwrap();
        }
        assert_eq!(sim.phase, RacePhase::Racing);
        assert!(sim.bodies[0].particle.pos.x > 0.0);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut sim = racing_sim();
        sim.add_body(Body::player("p", Particle::new(1.0, Vec3::ZERO), Car::new(Vec3::X)))
            .unwrap();
        sim.set_input(accelerate());
        sim.update(SIM_DT).unwrap();

        sim.set_paused(true);
        let before = sim.bodies[0].particle.pos;
        let elapsed = sim.elapsed;
        for _ in 0..10 {
            sim.update(SIM_DT).unwrap();
        }
        assert_eq!(sim.bodies[0].particle.pos, before);
        assert_eq!(sim.elapsed, elapsed);
    }

    #[test]
    fn test_clock_stays_accurate_over_long_races() {
        let mut sim = Simulation::new(G, SIM_DT);
        for _ in 0..200_000 {
            sim.update(SIM_DT).unwrap();
        }
        assert!((sim.elapsed - 200.0).abs() < 1e-3);
        assert!((sim.race_time() - 197.0).abs() < 1e-3);
        assert_eq!(sim.ticks, 200_000 - 2999);
    }

    #[test]
    fn test_uninitialized_body_fails_tick() {
        let mut sim = racing_sim();
        sim.add_body(Body::plain("ghost", Particle::default())).unwrap();
        assert_eq!(sim.update(SIM_DT), Err(SimError::NotInitialized));
    }

    #[test]
    fn test_contact_forces_cancel() {
        let mut sim = racing_sim().with_friction(0.0, 0.0);
        sim.add_body(Body::plain(
            "a",
            Particle::new(1.0, Vec3::ZERO).with_velocity(Vec3::new(1.0, 0.0, 0.0)),
        ))
        .unwrap();
        sim.add_body(Body::plain("b", Particle::new(1.0, Vec3::new(0.2, 0.0, 0.0))))
            .unwrap();
        sim.update(SIM_DT).unwrap();
        let total = sim.bodies[0].particle.vel + sim.bodies[1].particle.vel;
        assert!((total - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);
        assert!(sim.bodies[1].particle.vel.x > 0.0);
    }

    #[test]
    fn test_spring_pulls_bodies_together() {
        let mut sim = racing_sim().with_friction(0.0, 0.0);
        sim.add_body(Body::plain("a", Particle::new(1.0, Vec3::ZERO)))
            .unwrap();
        sim.add_body(Body::plain("b", Particle::new(1.0, Vec3::new(3.0, 0.0, 0.0))))
            .unwrap();
        sim.add_spring(Spring {
            a: 0,
            b: 1,
            ks: 10.0,
            kd: 0.0,
            rest_length: 1.0,
        })
        .unwrap();
        sim.update(SIM_DT).unwrap();
        assert!(sim.bodies[0].particle.vel.x > 0.0);
        assert!(sim.bodies[1].particle.vel.x < 0.0);
    }

    #[test]
    fn test_lap_completion_finishes_race() {
        let mut sim = racing_sim();
        let start = Vec3::new(-0.05, 0.0, 0.0);
        sim.add_body(Body::player(
            "p",
            Particle::new(1.0, start).with_velocity(Vec3::new(5.0, 0.0, 0.0)),
            Car::new(Vec3::X),
        ))
        .unwrap();
        sim.set_finish_line(FinishLine::new(Vec3::ZERO, Vec3::X, 2.0), 1);
        sim.set_input(accelerate());

        // Starting behind the line: the first crossing is not a lap
        for _ in 0..50 {
            sim.update(SIM_DT).unwrap();
        }
        assert_eq!(sim.laps(0), 0);
        assert!(sim.bodies[0].particle.pos.x > 0.0);

        // Put the car back behind the line without a crossing
        let p = &mut sim.bodies[0].particle;
        p.pos = start;
        p.delta_pos = Vec3::ZERO;

        for _ in 0..50 {
            sim.update(SIM_DT).unwrap();
        }
        assert_eq!(sim.laps(0), 1);
        assert_eq!(sim.phase, RacePhase::Finished);
        let winner = sim.leaderboard.winner().unwrap();
        assert_eq!(winner.body, 0);
        assert!((winner.race_time - sim.race_time()).abs() < 0.1);
    }

    #[test]
    fn test_plain_bodies_do_not_block_finish() {
        let mut sim = racing_sim();
        sim.add_body(Body::plain("ball", Particle::new(1.0, Vec3::new(0.0, 0.0, 50.0))))
            .unwrap();
        sim.set_finish_line(FinishLine::new(Vec3::ZERO, Vec3::X, 2.0), 1);
        sim.update(SIM_DT).unwrap();
        // No racers at all: the race never reports finished
        assert_eq!(sim.phase, RacePhase::Racing);
    }

    #[test]
    fn test_stepper_runs_whole_ticks() {
        let mut sim = racing_sim();
        let mut stepper = FixedStepper::new(0.01);
        assert_eq!(stepper.advance(&mut sim, 0.025).unwrap(), 2);
        assert!((stepper.accumulator() - 0.005).abs() < 1e-6);
        assert_eq!(stepper.advance(&mut sim, 0.006).unwrap(), 1);
    }

    #[test]
    fn test_stepper_caps_frame_delta() {
        let mut sim = racing_sim();
        let mut stepper = FixedStepper::new(SIM_DT);
        let steps = stepper.advance(&mut sim, 5.0).unwrap();
        assert!(steps <= MAX_SUBSTEPS);
        assert!(steps >= 33);
        assert!(stepper.accumulator() < SIM_DT);
        assert_eq!(stepper.advance(&mut sim, f32::NAN).unwrap(), 0);
    }

    #[test]
    fn test_enemy_missing_curve_reported() {
        let mut sim = racing_sim();
        let id = sim.add_curve(HermiteCurve::new(&square_loop()).unwrap());
        sim.add_body(Body::enemy(
            "ai",
            Particle::new(1.0, Vec3::ZERO),
            crate::sim::Enemy::new(id, 1.0, 1.0),
        ))
        .unwrap();
        sim.curves.clear();
        assert_eq!(sim.update(SIM_DT), Err(SimError::MissingCurve(0)));
    }
}
