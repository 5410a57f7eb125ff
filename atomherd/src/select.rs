use crate::population::Population;
use crate::vecmath;
use crate::vecmath::Vector;

use std::cmp::Reverse;

/// ways of picking out a single atom, e.g. to inspect it.
/// ties always go to the lower handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Selection {
    None,
    Oldest,
    Youngest,
    Healthiest,
    Heaviest,
    Hungriest,
    /// closest to a given point
    Nearest,
}

impl Selection {
    /// `point` is only used by Nearest, in simulation coordinates
    pub fn select(self, population: &Population, point: Vector) -> Option<usize> {
        let atoms = population.iter();
        match self {
            Selection::None => None,
            Selection::Oldest => atoms.min_by_key(|(_, a)| Reverse(a.age)).map(|c| c.0),
            Selection::Youngest => atoms.min_by_key(|(_, a)| a.age).map(|c| c.0),
            Selection::Healthiest => atoms
                .map(|(i, a)| (i, a.health))
                .min_by(|a, b| b.1.total_cmp(&a.1))
                .map(|c| c.0),
            Selection::Heaviest => atoms
                .map(|(i, a)| (i, a.mass()))
                .min_by(|a, b| b.1.total_cmp(&a.1))
                .map(|c| c.0),
            // lowest hunger value, i.e. closest to starving
            Selection::Hungriest => atoms
                .map(|(i, a)| (i, a.hunger))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|c| c.0),
            Selection::Nearest => atoms
                .map(|(i, a)| (i, vecmath::dist(a.pos, point)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|c| c.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Species, test_atom};

    #[test]
    fn selections() {
        let mut p = Population::default();
        let mut a = test_atom([0., 0.], Species::Red);
        a.age = 5;
        a.hunger = 30.;
        let mut b = test_atom([10., 0.], Species::Blue);
        b.age = 9;
        b.health = 50.;
        let mut c = test_atom([20., 0.], Species::Food);
        c.age = 9;
        p.spawn(a);
        p.spawn(b);
        p.spawn(c);

        assert_eq!(Selection::Oldest.select(&p, [0.; 2]), Some(1));
        assert_eq!(Selection::Youngest.select(&p, [0.; 2]), Some(0));
        assert_eq!(Selection::Healthiest.select(&p, [0.; 2]), Some(0));
        assert_eq!(Selection::Heaviest.select(&p, [0.; 2]), Some(0));
        assert_eq!(Selection::Hungriest.select(&p, [0.; 2]), Some(0));
        assert_eq!(Selection::Nearest.select(&p, [18., 3.]), Some(2));
        assert_eq!(Selection::None.select(&p, [0.; 2]), None);
    }

    #[test]
    fn empty() {
        let p = Population::default();
        assert_eq!(Selection::Oldest.select(&p, [0.; 2]), None);
    }
}
