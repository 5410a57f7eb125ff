use crate::atom::{Atom, Species, WHITE};
use crate::config::WORLD_SIZE;
use crate::population::Population;
use crate::select::Selection;
use crate::vecmath;
use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;

/// an atom built from small integers, so there are no nans or infinities to worry about
#[derive(Clone, Copy, Debug)]
struct Disc {
    pos: (i16, i16),
    vel: (i8, i8),
    mass: u8,
}

impl Arbitrary for Disc {
    fn arbitrary(g: &mut Gen) -> Self {
        Disc {
            pos: (i16::arbitrary(g), i16::arbitrary(g)),
            vel: (i8::arbitrary(g), i8::arbitrary(g)),
            mass: u8::arbitrary(g),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let d = *self;
        Box::new(
            d.mass
                .shrink()
                .map(move |mass| Disc { mass, ..d })
                .chain(d.vel.shrink().map(move |vel| Disc { vel, ..d })),
        )
    }
}

impl Disc {
    fn atom(self) -> Atom {
        Atom::new(
            [self.pos.0 as f64 / 10., self.pos.1 as f64 / 10.],
            [self.vel.0 as f64 / 10., self.vel.1 as f64 / 10.],
            self.mass as f64 / 10. + 0.1,
            0.,
            5.,
            WHITE,
            Species::Red,
        )
        .unwrap()
    }
}

fn momentum(a: &Atom, b: &Atom) -> [f64; 2] {
    vecmath::add(a.momentum(), b.momentum())
}

#[quickcheck]
fn collisions_conserve_momentum(a: Disc, b: Disc) -> bool {
    let (mut a, mut b) = (a.atom(), b.atom());
    let before = momentum(&a, &b);
    a.resolve_collision(&mut b, 0.98);
    let after = momentum(&a, &b);
    let tolerance = 1e-9 * (1. + vecmath::len(before).max(vecmath::len(after)));
    (before[0] - after[0]).abs() < tolerance && (before[1] - after[1]).abs() < tolerance
}

#[quickcheck]
fn collisions_never_add_energy(a: Disc, b: Disc) -> bool {
    let (mut a, mut b) = (a.atom(), b.atom());
    let before = a.kinetic_energy() + b.kinetic_energy();
    a.resolve_collision(&mut b, 0.98);
    let after = a.kinetic_energy() + b.kinetic_energy();
    after <= before + 1e-9 * (1. + before)
}

#[quickcheck]
fn reset_force_is_idempotent(a: Disc, f: (i8, i8)) -> bool {
    let mut a = a.atom();
    a.apply_force([f.0 as f64, f.1 as f64]);
    a.reset_force();
    let once = a.force;
    a.reset_force();
    once == [0., 0.] && a.force == [0., 0.]
}

#[quickcheck]
fn non_positive_mass_never_constructs(m: u16) -> bool {
    let mass = -(m as f64) / 7.;
    Atom::new([0.; 2], [0.; 2], mass, 1., 5., WHITE, Species::Blue).is_err()
}

#[quickcheck]
fn bounds_hold(x: i32, y: i32, a: Disc) -> bool {
    let mut atom = a.atom();
    atom.pos = [x as f64 / 100., y as f64 / 100.];
    let outside = atom.pos[0] < 0. || atom.pos[0] > WORLD_SIZE;
    let vel = atom.vel;
    atom.check_bounds(WORLD_SIZE);
    let inside = atom.pos.iter().all(|p| (0. ..=WORLD_SIZE).contains(p));
    inside && (!outside || atom.vel[0] == -vel[0])
}

#[quickcheck]
fn oldest_is_oldest(ages: Vec<u16>) -> TestResult {
    if ages.is_empty() {
        return TestResult::discard();
    }
    let mut p = Population::default();
    for &age in &ages {
        let mut a = Disc {
            pos: (0, 0),
            vel: (0, 0),
            mass: 1,
        }
        .atom();
        a.age = age as u64;
        p.spawn(a);
    }
    let picked = Selection::Oldest.select(&p, [0.; 2]).unwrap();
    let max = *ages.iter().max().unwrap();
    // first of the oldest
    let first = ages.iter().position(|&a| a == max).unwrap();
    TestResult::from_bool(picked == first)
}

#[quickcheck]
fn commit_keeps_creation_order(remove: Vec<bool>, births: u8) -> bool {
    let mut p = Population::default();
    for _ in 0..remove.len() {
        p.spawn(
            Disc {
                pos: (0, 0),
                vel: (0, 0),
                mass: 0,
            }
            .atom(),
        );
    }
    for (h, &r) in remove.iter().enumerate() {
        if r {
            p.remove(h);
        }
    }
    for _ in 0..(births % 8) {
        p.queue_birth(
            Disc {
                pos: (1, 1),
                vel: (0, 0),
                mass: 0,
            }
            .atom(),
        );
    }
    let expected = remove.iter().filter(|r| !**r).count() + (births % 8) as usize;
    p.commit();
    let ids: Vec<u64> = p.atoms().map(|a| a.id).collect();
    ids.len() == expected && ids.windows(2).all(|w| w[0] < w[1])
}
