//! read-only view of the simulation for whoever draws it.
//!
//! the simulation itself has no idea about screens, cameras or zoom,
//! a frame is everything a renderer gets to see.

use crate::atom::{Atom, Rgb, Species};
use crate::population::Population;
use crate::structure::EvolvingStructure;
use crate::vecmath::Vector;

use serde_derive::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AtomView {
    pub id: u64,
    pub pos: Vector,
    pub size: f64,
    pub species: Species,
    pub color: Rgb,
    /// oldest first
    pub trail: Vec<Vector>,
    /// health bar fill, 0 to 1
    pub health: f64,
}

impl AtomView {
    pub fn new(atom: &Atom) -> Self {
        Self {
            id: atom.id,
            pos: atom.pos,
            size: atom.size(),
            species: atom.species(),
            color: shade(atom.energy, atom.charge),
            trail: atom.trail.iter().copied().collect(),
            health: (atom.health / 100.).clamp(0., 1.),
        }
    }
}

/// brighter with more energy, blueish for positive charges and reddish otherwise
pub fn shade(energy: f64, charge: f64) -> Rgb {
    // saturating float to int cast takes care of negative and nan energy
    let i = (energy * 10.).min(255.) as u8;
    if charge > 0. { [i, i, 255] } else { [255, i, i] }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructureView {
    pub pos: Vector,
    pub size: f64,
    pub age: u64,
    pub atoms: Vec<AtomView>,
}

impl StructureView {
    pub fn new(s: &EvolvingStructure) -> Self {
        Self {
            pos: s.pos,
            size: s.size(),
            age: s.age,
            atoms: s.atoms().iter().map(AtomView::new).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub atoms: Vec<AtomView>,
    pub structures: Vec<StructureView>,
}

impl Frame {
    pub fn new(tick: u64, population: &Population, structures: &[EvolvingStructure]) -> Self {
        Self {
            tick,
            atoms: population.atoms().map(AtomView::new).collect(),
            structures: structures.iter().map(StructureView::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::test_atom;

    #[test]
    fn shading() {
        assert_eq!(shade(100., 1.), [255, 255, 255]);
        assert_eq!(shade(2., 1.), [20, 20, 255]);
        assert_eq!(shade(2., -1.), [255, 20, 20]);
        // food has no charge
        assert_eq!(shade(0.5, 0.), [255, 5, 5]);
        assert_eq!(shade(-3., 1.), [0, 0, 255]);
    }

    #[test]
    fn frame_mirrors_population() {
        let mut p = Population::default();
        p.spawn(test_atom([1., 2.], Species::Red));
        let mut b = test_atom([3., 4.], Species::Blue);
        b.health = 25.;
        p.spawn(b);
        p.remove(0);
        let s = EvolvingStructure::new([400., 400.], 20., 0.1).unwrap();
        let before = p.clone();

        let frame = Frame::new(7, &p, std::slice::from_ref(&s));
        assert_eq!(p, before);
        assert_eq!(frame.tick, 7);
        assert_eq!(frame.atoms.len(), 1);
        assert_eq!(frame.atoms[0].id, 1);
        assert_eq!(frame.atoms[0].health, 0.25);
        assert_eq!(frame.structures[0].size, 20.);

        let mut p2 = Population::default();
        let mut over = test_atom([0., 0.], Species::Red);
        over.health = 150.;
        over.trail.extend([[0., 0.], [1., 2.]]);
        p2.spawn(over);
        let frame = Frame::new(0, &p2, &[]);
        assert_eq!(frame.atoms[0].health, 1.);
        assert_eq!(frame.atoms[0].trail, vec![[0., 0.], [1., 2.]]);
    }
}
