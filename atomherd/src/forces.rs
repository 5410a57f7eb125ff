//! pairwise gravity and charge forces
//!
//! every atom only reads the positions of the others and only writes to itself,
//! so the pass runs in parallel. contributions are summed per atom in ascending handle
//! order and each pair is evaluated with the lower handle first, which makes the
//! result bit-identical to walking all pairs i < j one after another.

use crate::atom::Atom;
use crate::config::SimConfig;
use crate::population::Population;
use crate::vecmath::Vector;

use rayon::prelude::IndexedParallelIterator;
use rayon::prelude::IntoParallelRefMutIterator;
use rayon::prelude::ParallelIterator;

/// the part of an atom the force field looks at
#[derive(Copy, Clone, Debug)]
struct Body {
    pos: Vector,
    mass: f64,
    charge: f64,
}

impl From<&Atom> for Body {
    fn from(a: &Atom) -> Self {
        Body {
            pos: a.pos,
            mass: a.mass(),
            charge: a.charge,
        }
    }
}

/// force on `a` caused by `b`, `b` gets the negation.
/// None if the two are on top of each other or too far apart.
fn pair_force(a: &Body, b: &Body, config: &SimConfig) -> Option<Vector> {
    let dx = b.pos[0] - a.pos[0];
    let dy = b.pos[1] - a.pos[1];
    let distance = dx.hypot(dy);
    if distance == 0. || distance > config.force_threshold {
        return None;
    }
    let d2 = distance * distance;
    let gravity = config.gravity * a.mass * b.mass / d2;
    // like charges give a positive product and push apart,
    // opposite charges end up adding to gravity
    let electric = if a.charge == 0. || b.charge == 0. {
        0.
    } else {
        config.coulomb * a.charge * b.charge / d2
    };
    let net = gravity - electric;
    let fx = net * dx / distance * config.force_scale;
    let fy = net * dy / distance * config.force_scale;
    Some([fx, fy])
}

/// resets all forces, applies every pairwise force and then the drag.
///
/// the drag is the negated velocity the atom carried into this pass,
/// so an atom starting at rest only feels the field.
pub fn apply(population: &mut Population, config: &SimConfig) {
    let bodies: Vec<Option<Body>> = population
        .slots()
        .iter()
        .map(|s| s.as_ref().map(Body::from))
        .collect();

    population
        .slots_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, slot)| {
            let Some(atom) = slot else { return };
            let own = Body::from(&*atom);
            let initial_vel = atom.vel;
            atom.reset_force();
            for (j, other) in bodies.iter().enumerate() {
                let Some(other) = other else { continue };
                let f = if j < i {
                    pair_force(other, &own, config).map(|f| [-f[0], -f[1]])
                } else if j > i {
                    pair_force(&own, other, config)
                } else {
                    None
                };
                if let Some(f) = f {
                    atom.apply_force(f);
                }
            }
            atom.apply_force([-initial_vel[0], -initial_vel[1]]);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Species, test_atom};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    /// straightforward sequential version to compare against
    fn sequential(population: &mut Population, config: &SimConfig) {
        let handles = population.handles();
        let initial: Vec<Vector> = handles
            .iter()
            .map(|h| population.get(*h).unwrap().vel)
            .collect();
        for h in &handles {
            population.get_mut(*h).unwrap().reset_force();
        }
        for (n, &i) in handles.iter().enumerate() {
            for &j in &handles[n + 1..] {
                let (a, b) = population.pair_mut(i, j).unwrap();
                if let Some(f) = pair_force(&Body::from(&*a), &Body::from(&*b), config) {
                    a.apply_force(f);
                    b.apply_force([-f[0], -f[1]]);
                }
            }
        }
        for (h, v) in handles.iter().zip(initial) {
            population.get_mut(*h).unwrap().apply_force([-v[0], -v[1]]);
        }
    }

    #[test]
    fn opposite_charges_attract() {
        let config = SimConfig::default();
        let mut p = Population::default();
        p.spawn(test_atom([100., 100.], Species::Red));
        p.spawn(test_atom([110., 100.], Species::Blue));
        apply(&mut p, &config);
        let a = p.get(0).unwrap();
        let b = p.get(1).unwrap();
        assert!(a.vel[0] > 0.);
        assert!(b.vel[0] < 0.);
        assert_eq!(a.vel[1], 0.);
        // equal and opposite
        assert_eq!(a.force[0], -b.force[0]);
        // gravity plus attraction: 0.01/100 + 0.01/100
        assert!((a.force[0] - 2e-4).abs() < 1e-15);
    }

    #[test]
    fn like_charges_repel() {
        let config = SimConfig::default();
        let mut p = Population::default();
        p.spawn(test_atom([100., 100.], Species::Red));
        p.spawn(test_atom([100., 110.], Species::Red));
        apply(&mut p, &config);
        // gravity and repulsion cancel out exactly for unit mass and charge
        assert_eq!(p.get(0).unwrap().vel, [0., 0.]);

        let config = SimConfig {
            gravity: 0.,
            ..SimConfig::default()
        };
        apply(&mut p, &config);
        assert!(p.get(0).unwrap().vel[1] < 0.);
        assert!(p.get(1).unwrap().vel[1] > 0.);
    }

    #[test]
    fn far_and_coincident_pairs_are_skipped() {
        let config = SimConfig::default();
        let mut p = Population::default();
        p.spawn(test_atom([0., 0.], Species::Red));
        p.spawn(test_atom([0., 0.], Species::Blue));
        p.spawn(test_atom([500., 500.], Species::Blue));
        apply(&mut p, &config);
        for a in p.atoms() {
            assert_eq!(a.force, [0., 0.]);
            assert_eq!(a.vel, [0., 0.]);
        }
    }

    #[test]
    fn drag_uses_incoming_velocity() {
        let config = SimConfig::default();
        let mut p = Population::default();
        let mut food = test_atom([0., 0.], Species::Food);
        food.vel = [1., 0.];
        p.spawn(food);
        apply(&mut p, &config);
        let food = p.get(0).unwrap();
        assert_eq!(food.force, [-1., 0.]);
        // mass 0.1, so the drag overshoots
        assert!((food.vel[0] + 9.).abs() < 1e-9);
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = SimConfig {
            force_threshold: 400.,
            ..SimConfig::default()
        };
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let mut p = Population::default();
        for i in 0..60 {
            let species = [Species::Red, Species::Blue, Species::Food][i % 3];
            let mut a = test_atom(
                [rng.random_range(0.0..300.), rng.random_range(0.0..300.)],
                species,
            );
            a.vel = [rng.random_range(-2.0..2.), rng.random_range(-2.0..2.)];
            p.spawn(a);
        }
        // holes must not change anything
        p.remove(13);
        p.remove(40);
        let mut q = p.clone();
        apply(&mut p, &config);
        sequential(&mut q, &config);
        assert_eq!(p, q);
    }
}
