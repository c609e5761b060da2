//! Simulated bodies: a particle plus its behaviour variant

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::car::Car;
use super::enemy::Enemy;
use super::particle::Particle;

/// Behaviour attached to a particle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyKind {
    /// Passive particle: base forces only
    Plain,
    PlayerCar(Car),
    AiEnemy(Enemy),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub label: String,
    pub particle: Particle,
    pub kind: BodyKind,
}

impl Body {
    pub fn plain(label: impl Into<String>, particle: Particle) -> Self {
        Self {
            label: label.into(),
            particle,
            kind: BodyKind::Plain,
        }
    }

    pub fn player(label: impl Into<String>, particle: Particle, car: Car) -> Self {
        Self {
            label: label.into(),
            particle,
            kind: BodyKind::PlayerCar(car),
        }
    }

    pub fn enemy(label: impl Into<String>, particle: Particle, enemy: Enemy) -> Self {
        Self {
            label: label.into(),
            particle,
            kind: BodyKind::AiEnemy(enemy),
        }
    }

    /// Heading in radians from +X (plain particles report 0)
    pub fn rotation(&self) -> f32 {
        match &self.kind {
            BodyKind::Plain => 0.0,
            BodyKind::PlayerCar(car) => car.rotation(),
            BodyKind::AiEnemy(enemy) => enemy.rotation(),
        }
    }

    pub fn forward(&self) -> Vec3 {
        match &self.kind {
            BodyKind::Plain => Vec3::ZERO,
            BodyKind::PlayerCar(car) => car.forward,
            BodyKind::AiEnemy(enemy) => enemy.forward,
        }
    }

    pub fn collided(&self) -> bool {
        match &self.kind {
            BodyKind::Plain => false,
            BodyKind::PlayerCar(car) => car.collided,
            BodyKind::AiEnemy(enemy) => enemy.collided,
        }
    }

    pub fn set_collided(&mut self, collided: bool) {
        match &mut self.kind {
            BodyKind::Plain => {}
            BodyKind::PlayerCar(car) => car.collided = collided,
            BodyKind::AiEnemy(enemy) => enemy.collided = collided,
        }
    }

    /// Cars and enemies take part in lap counting
    #[inline]
    pub fn is_racer(&self) -> bool {
        !matches!(self.kind, BodyKind::Plain)
    }
}
