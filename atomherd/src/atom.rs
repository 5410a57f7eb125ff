use crate::config::SimConfig;
use crate::vecmath;
use crate::vecmath::Vector;

use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

pub type Rgb = [u8; 3];

pub const YELLOW: Rgb = [255, 255, 0];
pub const GREEN: Rgb = [0, 255, 0];
pub const WHITE: Rgb = [255, 255, 255];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Species {
    Red,
    Blue,
    Food,
}

impl Species {
    pub fn is_food(self) -> bool {
        self == Species::Food
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AtomError {
    #[error("mass must be positive, got {0}")]
    NonPositiveMass(f64),
    #[error("size must be positive, got {0}")]
    NonPositiveSize(f64),
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("a living atom needs positive health, got {0}")]
    NonPositiveHealth(f64),
    #[error("cooldown must not be negative, got {0}")]
    NegativeCooldown(f64),
}

/// a single simulated particle, either an agent or a piece of food.
///
/// mass, size and species are only reachable through accessors,
/// so the invariants checked in [`Atom::new`] hold for the whole lifetime.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Atom {
    /// assigned by the population on insertion, unique and increasing
    pub id: u64,
    pub pos: Vector,
    pub vel: Vector,
    /// net force applied during the current force pass
    pub force: Vector,
    mass: f64,
    pub charge: f64,
    size: f64,
    pub color: Rgb,
    species: Species,
    pub energy: f64,
    pub hunger: f64,
    pub health: f64,
    pub age: u64,
    /// recent positions, oldest first. only used for drawing
    pub trail: VecDeque<Vector>,
    pub cooldown: f64,
    // reserved for fights, nothing sets this yet
    pub in_conflict: bool,
}

impl Atom {
    pub fn new(
        pos: Vector,
        vel: Vector,
        mass: f64,
        charge: f64,
        size: f64,
        color: Rgb,
        species: Species,
    ) -> Result<Self, AtomError> {
        let atom = Self {
            id: 0,
            pos,
            vel,
            force: [0.; 2],
            mass,
            charge,
            size,
            color,
            species,
            energy: 100.,
            hunger: 100.,
            health: 100.,
            age: 0,
            trail: VecDeque::new(),
            cooldown: 0.,
            in_conflict: false,
        };
        atom.validate()?;
        Ok(atom)
    }

    /// checks the construction invariants again,
    /// needed for atoms that did not come through new(), i.e. deserialized ones
    pub fn validate(&self) -> Result<(), AtomError> {
        if self.mass.is_nan() || self.mass <= 0. {
            return Err(AtomError::NonPositiveMass(self.mass));
        }
        if self.size.is_nan() || self.size <= 0. {
            return Err(AtomError::NonPositiveSize(self.size));
        }
        if !self.mass.is_finite() {
            return Err(AtomError::NonFinite("mass"));
        }
        if !self.size.is_finite() {
            return Err(AtomError::NonFinite("size"));
        }
        if !(self.pos[0].is_finite() && self.pos[1].is_finite()) {
            return Err(AtomError::NonFinite("position"));
        }
        if !(self.vel[0].is_finite() && self.vel[1].is_finite()) {
            return Err(AtomError::NonFinite("velocity"));
        }
        let vitals = [
            ("hunger", self.hunger),
            ("energy", self.energy),
            ("health", self.health),
            ("cooldown", self.cooldown),
        ];
        if let Some((name, _)) = vitals.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AtomError::NonFinite(name));
        }
        if self.health <= 0. {
            return Err(AtomError::NonPositiveHealth(self.health));
        }
        if self.cooldown < 0. {
            return Err(AtomError::NegativeCooldown(self.cooldown));
        }
        Ok(())
    }

    /// builds a fresh atom of the given species at a random spot
    pub fn create<R: Rng>(
        species: Species,
        config: &SimConfig,
        rng: &mut R,
    ) -> Result<Self, AtomError> {
        let x = rng.random_range(0.0..=config.world_size);
        let y = rng.random_range(0.0..=config.world_size);
        let speed = config.initial_speed;
        match species {
            Species::Red | Species::Blue => {
                let vel = [
                    rng.random_range(-speed..=speed),
                    rng.random_range(-speed..=speed),
                ];
                let (charge, color) = if species == Species::Red {
                    (1., YELLOW)
                } else {
                    (-1., GREEN)
                };
                Atom::new([x, y], vel, config.atom_mass, charge, config.atom_size, color, species)
            }
            Species::Food => Atom::new(
                [x, y],
                [0.; 2],
                config.food_mass,
                0.,
                config.food_size,
                WHITE,
                species,
            ),
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
    pub fn size(&self) -> f64 {
        self.size
    }
    pub fn species(&self) -> Species {
        self.species
    }

    /// only ever grows, negative or nan growth is ignored
    pub fn grow(&mut self, by: f64) {
        if by > 0. {
            self.size += by;
        }
    }

    /// adds to the net force and changes the velocity right away
    pub fn apply_force(&mut self, f: Vector) {
        debug_assert!(self.mass > 0.);
        self.force = vecmath::add(self.force, f);
        self.vel[0] += f[0] / self.mass;
        self.vel[1] += f[1] / self.mass;
    }

    pub fn reset_force(&mut self) {
        self.force = [0.; 2];
    }

    /// reflects the atom off the walls of the world and puts it back inside
    pub fn check_bounds(&mut self, world_size: f64) {
        for axis in 0..2 {
            let p = self.pos[axis];
            let v = self.vel[axis];
            let outside = p < 0. || p > world_size;
            // sitting right on the wall and still pushing outwards
            let leaving = (p <= 0. && v < 0.) || (p >= world_size && v > 0.);
            if outside || leaving {
                self.vel[axis] = -v;
            }
            self.pos[axis] = p.clamp(0., world_size);
        }
    }

    /// one integration step: move, damp, bounce, clamp speed, update energy and trail
    pub fn update_position(&mut self, config: &SimConfig) {
        self.pos[0] += self.vel[0] * config.speed;
        self.pos[1] += self.vel[1] * config.speed;
        self.vel = vecmath::scale(self.vel, config.damping);
        self.check_bounds(config.world_size);
        let max = config.max_velocity;
        self.vel[0] = self.vel[0].clamp(-max, max);
        self.vel[1] = self.vel[1].clamp(-max, max);
        self.energy = self.kinetic_energy();

        self.trail.push_back(self.pos);
        while self.trail.len() > config.trail_length {
            self.trail.pop_front();
        }
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * vecmath::dot(self.vel, self.vel)
    }

    pub fn momentum(&self) -> Vector {
        vecmath::scale(self.vel, self.mass)
    }

    pub fn distance(&self, other: &Atom) -> f64 {
        vecmath::dist(self.pos, other.pos)
    }

    /// true if the circles overlap
    pub fn check_collision(&self, other: &Atom) -> bool {
        self.distance(other) < self.size + other.size
    }

    /// elastic impulse along the line between the centers, scaled down by `damping`.
    /// does nothing for coincident centers or atoms that already move apart.
    pub fn resolve_collision(&mut self, other: &mut Atom, damping: f64) {
        let delta = vecmath::sub(other.pos, self.pos);
        let distance = vecmath::len(delta);
        if distance == 0. {
            return;
        }
        let normal = vecmath::scale(delta, 1. / distance);
        // positive: moving apart along the normal
        let closing = vecmath::dot(vecmath::sub(other.vel, self.vel), normal);
        if closing >= 0. {
            return;
        }
        let impulse = (2. * closing) / (self.mass + other.mass);
        let own = impulse * other.mass * damping;
        let theirs = impulse * self.mass * damping;
        self.vel[0] += own * normal[0];
        self.vel[1] += own * normal[1];
        other.vel[0] -= theirs * normal[0];
        other.vel[1] -= theirs * normal[1];
    }

    /// nudges the velocity by `strength` towards the target
    pub fn steer_towards(&mut self, target: Vector, strength: f64) {
        // no direction to a target right on top of us, norm keeps that at zero
        let dir = vecmath::norm(vecmath::sub(target, self.pos));
        self.vel = vecmath::add(self.vel, vecmath::scale(dir, strength));
    }

    /// random nudge in both axes, uniform in [-amount, amount]
    pub fn jitter<R: Rng>(&mut self, rng: &mut R, amount: f64) {
        self.vel[0] += rng.random_range(-amount..=amount);
        self.vel[1] += rng.random_range(-amount..=amount);
    }
}

#[cfg(test)]
pub fn test_atom(pos: Vector, species: Species) -> Atom {
    let (mass, charge) = match species {
        Species::Food => (0.1, 0.),
        Species::Red => (1., 1.),
        Species::Blue => (1., -1.),
    };
    let size = if species.is_food() { 3. } else { 5. };
    Atom::new(pos, [0.; 2], mass, charge, size, WHITE, species).unwrap()
}

#[test]
fn rejects_bad_mass() {
    let new = |mass| Atom::new([0.; 2], [0.; 2], mass, 0., 1., WHITE, Species::Food);
    assert_eq!(new(0.).unwrap_err(), AtomError::NonPositiveMass(0.));
    assert_eq!(new(-1.).unwrap_err(), AtomError::NonPositiveMass(-1.));
    assert!(matches!(new(f64::NAN), Err(AtomError::NonPositiveMass(_))));
    assert!(new(0.1).is_ok());
}

#[test]
fn rejects_bad_size() {
    let atom = Atom::new([0.; 2], [0.; 2], 1., 0., 0., WHITE, Species::Red);
    assert_eq!(atom.unwrap_err(), AtomError::NonPositiveSize(0.));
}

#[test]
fn rejects_dead_or_broken_vitals() {
    let mut a = test_atom([0., 0.], Species::Red);
    a.validate().unwrap();
    a.health = 0.;
    assert_eq!(a.validate().unwrap_err(), AtomError::NonPositiveHealth(0.));
    a.health = 100.;
    a.cooldown = -5.;
    assert_eq!(a.validate().unwrap_err(), AtomError::NegativeCooldown(-5.));
    a.cooldown = 0.;
    a.energy = f64::NAN;
    assert_eq!(a.validate().unwrap_err(), AtomError::NonFinite("energy"));
    a.energy = 3.;
    // hunger may run below zero while the atom starves
    a.hunger = -1.;
    a.validate().unwrap();
}

#[test]
fn force_changes_velocity_immediately() {
    let mut a = test_atom([10., 10.], Species::Food);
    a.apply_force([1., -2.]);
    assert_eq!(a.force, [1., -2.]);
    assert!((a.vel[0] - 10.).abs() < 1e-12);
    assert!((a.vel[1] + 20.).abs() < 1e-12);
}

#[test]
fn reset_force_twice() {
    let mut a = test_atom([10., 10.], Species::Red);
    a.apply_force([3., 4.]);
    a.reset_force();
    assert_eq!(a.force, [0., 0.]);
    a.reset_force();
    assert_eq!(a.force, [0., 0.]);
}

#[test]
fn bounds_on_the_wall() {
    let w = 1200.;
    let mut a = test_atom([0., w], Species::Red);
    a.vel = [-1., 2.];
    a.check_bounds(w);
    assert_eq!(a.vel, [1., -2.]);
    assert_eq!(a.pos, [0., w]);

    // inwards on the wall is left alone
    a.check_bounds(w);
    assert_eq!(a.vel, [1., -2.]);
}

#[test]
fn bounds_outside() {
    let w = 100.;
    let mut a = test_atom([-5., 105.], Species::Red);
    a.vel = [-1., 1.];
    a.check_bounds(w);
    assert_eq!(a.pos, [0., 100.]);
    assert_eq!(a.vel, [1., -1.]);
}

#[test]
fn update_position_clamps_and_trails() {
    let config = SimConfig::default();
    let mut a = test_atom([600., 600.], Species::Red);
    a.vel = [50., -50.];
    for _ in 0..(config.trail_length + 5) {
        a.update_position(&config);
    }
    assert!(a.vel[0].abs() <= config.max_velocity);
    assert!(a.vel[1].abs() <= config.max_velocity);
    assert_eq!(a.trail.len(), config.trail_length);
    assert_eq!(*a.trail.back().unwrap(), a.pos);
    assert!((a.energy - a.kinetic_energy()).abs() < 1e-12);
}

#[test]
fn collision_is_strict() {
    let a = test_atom([0., 0.], Species::Red);
    let b = test_atom([10., 0.], Species::Red);
    // touching exactly is not colliding
    assert!(!a.check_collision(&b));
    let c = test_atom([9.99, 0.], Species::Red);
    assert!(a.check_collision(&c));
}

#[test]
fn head_on_collision_bounces() {
    let mut a = test_atom([0., 0.], Species::Red);
    let mut b = test_atom([5., 0.], Species::Red);
    a.vel = [1., 0.];
    b.vel = [-1., 0.];
    a.resolve_collision(&mut b, 0.98);
    assert!((a.vel[0] + 0.96).abs() < 1e-12);
    assert!((b.vel[0] - 0.96).abs() < 1e-12);
    assert_eq!(a.vel[1], 0.);

    // now separating, a second resolve does nothing
    let (va, vb) = (a.vel, b.vel);
    a.resolve_collision(&mut b, 0.98);
    assert_eq!((a.vel, b.vel), (va, vb));
}

#[test]
fn coincident_collision_is_noop() {
    let mut a = test_atom([3., 3.], Species::Red);
    let mut b = test_atom([3., 3.], Species::Blue);
    a.vel = [1., 1.];
    b.vel = [-1., 0.];
    a.resolve_collision(&mut b, 0.98);
    assert_eq!(a.vel, [1., 1.]);
    assert_eq!(b.vel, [-1., 0.]);
}

#[test]
fn steering() {
    let mut a = test_atom([0., 0.], Species::Red);
    a.steer_towards([0., 10.], 0.1);
    assert_eq!(a.vel, [0., 0.1]);
    // no direction to itself
    a.steer_towards(a.pos, 0.1);
    assert_eq!(a.vel, [0., 0.1]);
}
