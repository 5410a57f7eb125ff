use crate::atom::{Atom, AtomError, Rgb};
use crate::config::SimConfig;
use crate::population::Population;
use crate::vecmath;

use rayon::prelude::IntoParallelRefMutIterator;
use rayon::prelude::ParallelIterator;
use tracing::trace;

/// ages the atom by one tick and drains its vitals.
/// returns false if the atom died from it
pub fn decay(atom: &mut Atom, config: &SimConfig) -> bool {
    atom.age += 1;
    atom.hunger -= config.hunger_decay;
    atom.energy -= config.energy_decay;
    if atom.hunger <= 0. || atom.energy <= 0. {
        atom.health -= config.starvation_damage;
    }
    atom.health > 0.
}

/// decays every atom and removes the dead ones.
/// returns the number of deaths
pub fn advance(population: &mut Population, config: &SimConfig) -> usize {
    population.slots_mut().par_iter_mut().for_each(|slot| {
        if let Some(atom) = slot {
            decay(atom, config);
        }
    });
    cull(population)
}

/// removes everything at or below zero health, returns how many
pub fn cull(population: &mut Population) -> usize {
    let dead: Vec<usize> = population
        .iter()
        .filter(|(_, a)| a.health <= 0.)
        .map(|(h, _)| h)
        .collect();
    for &h in &dead {
        if let Some(atom) = population.remove(h) {
            trace!(id = atom.id, age = atom.age, "died");
        }
    }
    population.commit();
    dead.len()
}

/// mixes two parents into a child.
/// the child sits on the first parent and inherits its species,
/// masses add up, everything else is averaged, health is the weaker one.
pub fn combine(first: &Atom, second: &Atom) -> Result<Atom, AtomError> {
    let avg = |a: f64, b: f64| (a + b) / 2.;
    let color: Rgb = [
        ((first.color[0] as u16 + second.color[0] as u16) / 2) as u8,
        ((first.color[1] as u16 + second.color[1] as u16) / 2) as u8,
        ((first.color[2] as u16 + second.color[2] as u16) / 2) as u8,
    ];
    let vel = vecmath::scale(vecmath::add(first.vel, second.vel), 0.5);
    let mut child = Atom::new(
        first.pos,
        vel,
        first.mass() + second.mass(),
        avg(first.charge, second.charge),
        avg(first.size(), second.size()),
        color,
        first.species(),
    )?;
    child.health = first.health.min(second.health);
    Ok(child)
}

/// combines the two atoms at the handles into a new one and puts both parents on cooldown.
/// the child is queued and joins the population on the next commit.
/// returns the id of the child
pub fn mate(
    population: &mut Population,
    parent: usize,
    mate: usize,
    config: &SimConfig,
) -> Result<Option<u64>, AtomError> {
    let Some((a, b)) = population.pair_mut(parent, mate) else {
        return Ok(None);
    };
    let child = combine(a, b)?;
    a.cooldown = config.reproduction_cooldown;
    b.cooldown = config.reproduction_cooldown;
    let (pa, pb) = (a.id, b.id);
    let id = population.queue_birth(child);
    trace!(id, parents = ?(pa, pb), "born");
    Ok(Some(id))
}
