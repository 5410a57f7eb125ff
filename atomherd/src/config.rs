//! Tunables of the simulation.
//!
//! The constants are the defaults, the actual simulation only ever reads a [`SimConfig`]
//! which is handed to it on construction and never changes afterwards.

use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const WORLD_SIZE: f64 = 1200.;
pub const MAX_VELOCITY: f64 = 5.;
pub const DAMPING: f64 = 0.995;
pub const COLLISION_DAMPING: f64 = 0.98;
pub const FORCE_SCALE: f64 = 1.;
pub const GRAVITY: f64 = 0.01;
pub const COULOMB: f64 = 0.01;
pub const FORCE_THRESHOLD: f64 = 100.;
pub const REPRODUCTION_COOLDOWN: f64 = 60.;
pub const TRAIL_LENGTH: usize = 10;

pub const INITIAL_ATOMS: usize = 100;
pub const INITIAL_FOOD: usize = 50;
pub const INITIAL_STRUCTURES: usize = 5;

/// vitals start at and are capped to this
pub const VITAL_MAX: f64 = 100.;

/// behavior thresholds and strengths
pub mod b {
    pub const STEER: f64 = 0.1;
    pub const WANDER: f64 = 0.1;
    pub const PANIC: f64 = 1.;
    pub const FLEE_HEALTH: f64 = 30.;
    pub const HUNGRY: f64 = 50.;
    pub const MATING_HEALTH: f64 = 50.;
    pub const MATE_HEALTH: f64 = 70.;
    pub const FEED: f64 = 20.;
}

/// per tick decay of the vitals
pub mod l {
    pub const HUNGER_DECAY: f64 = 0.1;
    pub const ENERGY_DECAY: f64 = 0.2;
    pub const STARVATION_DAMAGE: f64 = 0.5;
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// how often entities get stepped per tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TickCadence {
    /// the full reference loop: an extra interaction sweep before the collision pass,
    /// and a behavior decision both during the lifecycle pass and the behavior pass.
    /// entities get integrated twice per tick.
    #[default]
    Reference,
    /// each phase once, one integration step per tick.
    Single,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub cadence: TickCadence,

    // world and physics
    pub world_size: f64,
    pub speed: f64,
    pub max_velocity: f64,
    pub damping: f64,
    pub collision_damping: f64,
    pub force_scale: f64,
    pub gravity: f64,
    pub coulomb: f64,
    pub force_threshold: f64,
    pub trail_length: usize,

    // lifecycle
    pub hunger_decay: f64,
    pub energy_decay: f64,
    pub starvation_damage: f64,
    pub reproduction_cooldown: f64,
    pub mating_season: bool,
    pub vital_max: f64,

    // behavior
    pub steer: f64,
    pub wander: f64,
    pub panic: f64,
    pub flee_health: f64,
    pub hungry: f64,
    pub mating_health: f64,
    pub mate_health: f64,
    pub feed: f64,

    // initial population
    pub atoms: usize,
    pub food: usize,
    pub atom_size: f64,
    pub food_size: f64,
    pub atom_mass: f64,
    pub food_mass: f64,
    pub initial_speed: f64,
    pub structures: usize,
    pub structure_size: f64,
    pub structure_growth: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cadence: TickCadence::default(),

            world_size: WORLD_SIZE,
            speed: 1.,
            max_velocity: MAX_VELOCITY,
            damping: DAMPING,
            collision_damping: COLLISION_DAMPING,
            force_scale: FORCE_SCALE,
            gravity: GRAVITY,
            coulomb: COULOMB,
            force_threshold: FORCE_THRESHOLD,
            trail_length: TRAIL_LENGTH,

            hunger_decay: l::HUNGER_DECAY,
            energy_decay: l::ENERGY_DECAY,
            starvation_damage: l::STARVATION_DAMAGE,
            reproduction_cooldown: REPRODUCTION_COOLDOWN,
            mating_season: true,
            vital_max: VITAL_MAX,

            steer: b::STEER,
            wander: b::WANDER,
            panic: b::PANIC,
            flee_health: b::FLEE_HEALTH,
            hungry: b::HUNGRY,
            mating_health: b::MATING_HEALTH,
            mate_health: b::MATE_HEALTH,
            feed: b::FEED,

            atoms: INITIAL_ATOMS,
            food: INITIAL_FOOD,
            atom_size: 5.,
            food_size: 3.,
            atom_mass: 1.,
            // small but not zero, everything divides by mass
            food_mass: 0.1,
            initial_speed: 2.,
            structures: INITIAL_STRUCTURES,
            structure_size: 20.,
            structure_growth: 0.1,
        }
    }
}

impl SimConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("world_size", self.world_size),
            ("max_velocity", self.max_velocity),
            ("atom_size", self.atom_size),
            ("food_size", self.food_size),
            ("atom_mass", self.atom_mass),
            ("food_mass", self.food_mass),
            ("structure_size", self.structure_size),
        ];
        for (name, v) in positive {
            if !(v > 0. && v.is_finite()) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")));
            }
        }
        let non_negative = [
            ("speed", self.speed),
            ("force_threshold", self.force_threshold),
            ("hunger_decay", self.hunger_decay),
            ("energy_decay", self.energy_decay),
            ("starvation_damage", self.starvation_damage),
            ("reproduction_cooldown", self.reproduction_cooldown),
            ("steer", self.steer),
            ("wander", self.wander),
            ("panic", self.panic),
            ("feed", self.feed),
            ("initial_speed", self.initial_speed),
            ("structure_growth", self.structure_growth),
        ];
        for (name, v) in non_negative {
            if !(v >= 0. && v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not be negative, got {v}"
                )));
            }
        }
        for (name, v) in [
            ("damping", self.damping),
            ("collision_damping", self.collision_damping),
        ] {
            if !(v > 0. && v <= 1.) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1], got {v}"
                )));
            }
        }
        if !(self.vital_max > 0.) {
            return Err(ConfigError::Invalid("vital_max must be positive".into()));
        }
        Ok(())
    }
}

#[test]
fn default_is_valid() {
    SimConfig::default().validate().unwrap();
}

#[test]
fn rejects_zero_food_mass() {
    let config = SimConfig {
        food_mass: 0.,
        ..SimConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_undamped_collisions() {
    let config = SimConfig {
        collision_damping: 1.5,
        ..SimConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let config: SimConfig =
        serde_json::from_str(r#"{ "seed": 7, "cadence": "single", "atoms": 3 }"#).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.cadence, TickCadence::Single);
    assert_eq!(config.atoms, 3);
    assert_eq!(config.world_size, WORLD_SIZE);
}
