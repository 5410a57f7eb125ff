//! what an atom decides to do each tick.
//!
//! there is no state machine, the decision is made from scratch every tick
//! from hunger, health, cooldown and the surroundings.
//! all scans go through the population in handle order and see the changes
//! atoms earlier in the same pass already made.

use crate::atom::{Atom, AtomError};
use crate::collision;
use crate::config::SimConfig;
use crate::lifecycle;
use crate::population::Population;

use rand::Rng;
use tracing::trace;

/// the closest other atom matching the predicate.
/// ties go to the lower handle
pub fn nearest<F>(population: &Population, handle: usize, mut pred: F) -> Option<usize>
where
    F: FnMut(&Atom) -> bool,
{
    let me = population.get(handle)?;
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for (i, other) in population.iter() {
        if i == handle || !pred(other) {
            continue;
        }
        let d = me.distance(other);
        if d < best_dist {
            best_dist = d;
            best = Some(i);
        }
    }
    best
}

/// the first atom (by handle, not by distance) that is willing and able to mate with us
pub fn find_mate(population: &Population, handle: usize, config: &SimConfig) -> Option<usize> {
    let me = population.get(handle)?;
    population
        .iter()
        .find(|(i, other)| {
            *i != handle
                && other.health > config.mate_health
                && other.cooldown == 0.
                && other.species() == me.species()
        })
        .map(|(i, _)| i)
}

fn steer_to(population: &mut Population, handle: usize, target: usize, config: &SimConfig) {
    let Some(target) = population.get(target).map(|t| t.pos) else {
        return;
    };
    if let Some(me) = population.get_mut(handle) {
        me.steer_towards(target, config.steer);
    }
}

fn wander<R: Rng>(population: &mut Population, handle: usize, config: &SimConfig, rng: &mut R) {
    if let Some(me) = population.get_mut(handle) {
        me.jitter(rng, config.wander);
    }
}

/// bounce off everything we touch, and panic if we are badly hurt
pub fn flee<R: Rng>(population: &mut Population, handle: usize, config: &SimConfig, rng: &mut R) {
    collision::resolve_with(population, handle, config);
    if let Some(me) = population.get_mut(handle) {
        if me.health < config.flee_health {
            me.jitter(rng, config.panic);
        }
    }
}

/// picks and applies this tick's steering for one atom
pub fn decide<R: Rng>(population: &mut Population, handle: usize, config: &SimConfig, rng: &mut R) {
    let Some(me) = population.get_mut(handle) else {
        return;
    };
    if me.cooldown > 0. {
        me.cooldown = (me.cooldown - 1.).max(0.);
    }
    if me.health < config.flee_health {
        flee(population, handle, config, rng);
    } else {
        me.jitter(rng, config.wander);
    }

    let Some(me) = population.get(handle) else {
        return;
    };
    let (in_conflict, hunger, health, cooldown) =
        (me.in_conflict, me.hunger, me.health, me.cooldown);

    // everyone drifts towards their closest neighbour, friend or food
    if !in_conflict {
        if let Some(other) = nearest(population, handle, |_| true) {
            steer_to(population, handle, other, config);
        }
    }

    if hunger < config.hungry {
        if let Some(food) = nearest(population, handle, |a| a.species().is_food()) {
            steer_to(population, handle, food, config);
        }
    } else if config.mating_season
        && cooldown == 0.
        && hunger > config.hungry
        && health > config.mating_health
    {
        if let Some(mate) = find_mate(population, handle, config) {
            steer_to(population, handle, mate, config);
        }
    } else {
        match nearest(population, handle, |_| true) {
            Some(other) if population.get(other).is_some_and(|o| o.health < health) => {
                steer_to(population, handle, other, config)
            }
            _ => wander(population, handle, config, rng),
        }
    }
}

/// eats the first food we overlap with, if any.
/// the food is removed right away, its handle stays empty until the next commit
pub fn eat(population: &mut Population, handle: usize, config: &SimConfig) -> bool {
    let Some(me) = population.get(handle) else {
        return false;
    };
    let food = population
        .iter()
        .find(|(i, other)| *i != handle && other.species().is_food() && me.check_collision(other))
        .map(|(i, _)| i);
    let Some(food) = food else {
        return false;
    };
    if let Some(eaten) = population.remove(food) {
        trace!(id = eaten.id, "eaten");
    }
    if let Some(me) = population.get_mut(handle) {
        me.hunger = (me.hunger + config.feed).min(config.vital_max);
        me.energy = (me.energy + config.feed).min(config.vital_max);
    }
    true
}

/// mates with the first eligible partner if we are off cooldown.
/// returns the id of the queued child
pub fn reproduce(
    population: &mut Population,
    handle: usize,
    config: &SimConfig,
) -> Result<Option<u64>, AtomError> {
    match population.get(handle) {
        Some(me) if me.cooldown == 0. => {}
        _ => return Ok(None),
    }
    match find_mate(population, handle, config) {
        Some(mate) => lifecycle::mate(population, handle, mate, config),
        None => Ok(None),
    }
}
