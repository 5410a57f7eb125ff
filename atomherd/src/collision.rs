use crate::config::SimConfig;
use crate::population::Population;

/// resolves every overlapping pair once, lower handle first.
/// earlier resolutions are visible to later pairs.
/// returns the number of overlapping pairs found
pub fn resolve_all(population: &mut Population, config: &SimConfig) -> usize {
    let handles = population.handles();
    let mut hits = 0;
    for (n, &i) in handles.iter().enumerate() {
        for &j in &handles[n + 1..] {
            if let Some((a, b)) = population.pair_mut(i, j) {
                if a.check_collision(b) {
                    a.resolve_collision(b, config.collision_damping);
                    hits += 1;
                }
            }
        }
    }
    hits
}

/// resolves collisions between one atom and everyone it overlaps with
pub fn resolve_with(population: &mut Population, handle: usize, config: &SimConfig) {
    for other in 0..population.slot_count() {
        if let Some((a, b)) = population.pair_mut(handle, other) {
            if a.check_collision(b) {
                a.resolve_collision(b, config.collision_damping);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Species, test_atom};

    #[test]
    fn resolves_overlap_only() {
        let config = SimConfig::default();
        let mut p = Population::default();
        let mut a = test_atom([100., 100.], Species::Red);
        a.vel = [1., 0.];
        let mut b = test_atom([108., 100.], Species::Blue);
        b.vel = [-1., 0.];
        let mut far = test_atom([300., 100.], Species::Red);
        far.vel = [-1., 0.];
        p.spawn(a);
        p.spawn(b);
        p.spawn(far);
        assert_eq!(resolve_all(&mut p, &config), 1);
        assert!(p.get(0).unwrap().vel[0] < 0.);
        assert!(p.get(1).unwrap().vel[0] > 0.);
        assert_eq!(p.get(2).unwrap().vel, [-1., 0.]);
    }

    #[test]
    fn single_atom_sweep() {
        let config = SimConfig::default();
        let mut p = Population::default();
        let mut a = test_atom([100., 100.], Species::Red);
        a.vel = [0., 1.];
        p.spawn(a);
        p.spawn(test_atom([100., 105.], Species::Food));
        p.spawn(test_atom([100., 95.], Species::Food));
        resolve_with(&mut p, 0, &config);
        let total: f64 = p.atoms().map(|a| a.momentum()[1]).sum();
        assert!((total - 1.).abs() < 1e-12);
        assert!(p.get(1).unwrap().vel[1] > 0.);
    }
}
