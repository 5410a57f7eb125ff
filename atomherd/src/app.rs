use crate::atom::{Atom, Species};
use crate::behavior;
use crate::collision;
use crate::config::{ConfigError, SimConfig, TickCadence};
use crate::forces;
use crate::lifecycle;
use crate::population::Population;
use crate::select::Selection;
use crate::snapshot::Frame;
use crate::structure::EvolvingStructure;
use crate::vecmath::Vector;

use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::IntoParallelRefMutIterator;
use rayon::prelude::ParallelIterator;
use serde_derive::Serialize;
use std::io::Write;
use tracing::{debug, info, trace, warn};

pub type DetRng = rand_pcg::Pcg64Mcg;

/// the structure every fresh world starts with
pub const ANCHOR: Vector = [400., 400.];

/// what happened during one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    pub births: usize,
    pub deaths: usize,
    pub meals: usize,
    /// after the tick
    pub population: usize,
}

impl TickSummary {
    fn absorb(&mut self, other: TickSummary) {
        self.tick = other.tick;
        self.births += other.births;
        self.deaths += other.deaths;
        self.meals += other.meals;
        self.population = other.population;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PopulationStats {
    pub tick: u64,
    pub red: usize,
    pub blue: usize,
    pub food: usize,
    /// 0 for an empty population
    pub average_age: f64,
    pub oldest: u64,
    pub structures: usize,
}

#[derive(Debug)]
pub struct App {
    pub(crate) population: Population,
    pub(crate) structures: Vec<EvolvingStructure>,
    pub(crate) config: SimConfig,
    pub(crate) rng: DetRng,
    pub(crate) time: u64,
    last_report: u64,
    report_every: u64,
    report_file: Option<std::fs::File>,
}

fn invalid<E: std::fmt::Display>(e: E) -> ConfigError {
    ConfigError::Invalid(e.to_string())
}

/// builds the starting world: agents first, then food, then the structures
fn populate<R: Rng>(
    config: &SimConfig,
    rng: &mut R,
) -> Result<(Population, Vec<EvolvingStructure>), ConfigError> {
    let mut population = Population::with_capacity(config.atoms + config.food);
    for _ in 0..config.atoms {
        let species = if rng.random_bool(0.5) {
            Species::Red
        } else {
            Species::Blue
        };
        population.spawn(Atom::create(species, config, rng).map_err(invalid)?);
    }
    for _ in 0..config.food {
        population.spawn(Atom::create(Species::Food, config, rng).map_err(invalid)?);
    }

    let mut structures = Vec::with_capacity(config.structures + 1);
    let new = |pos| EvolvingStructure::new(pos, config.structure_size, config.structure_growth);
    structures.push(new(ANCHOR).map_err(invalid)?);
    let max = config.world_size as u64;
    for _ in 0..config.structures {
        let pos = [
            rng.random_range(0..=max) as f64,
            rng.random_range(0..=max) as f64,
        ];
        structures.push(new(pos).map_err(invalid)?);
    }
    Ok((population, structures))
}

/// runs one mating attempt and books the outcome
fn reproduce(
    population: &mut Population,
    handle: usize,
    config: &SimConfig,
    summary: &mut TickSummary,
) {
    match behavior::reproduce(population, handle, config) {
        Ok(Some(_)) => summary.births += 1,
        Ok(None) => {}
        Err(e) => warn!(handle, "offspring rejected: {e}"),
    }
}

/// every atom in turn wanders, eats, mates, bounces off whatever it touches and moves.
fn interaction_sweep(
    population: &mut Population,
    config: &SimConfig,
    rng: &mut DetRng,
    summary: &mut TickSummary,
) {
    for h in population.handles() {
        let Some(atom) = population.get_mut(h) else {
            // eaten earlier in this sweep
            continue;
        };
        atom.jitter(rng, config.wander);
        atom.check_bounds(config.world_size);
        if behavior::eat(population, h, config) {
            summary.meals += 1;
        }
        reproduce(population, h, config, summary);
        collision::resolve_with(population, h, config);
        behavior::flee(population, h, config, rng);
        if let Some(atom) = population.get_mut(h) {
            atom.update_position(config);
        }
    }
}

/// decays every atom in order, the survivors decide right away, the dead are removed.
/// returns the number of deaths
fn decay_and_decide(population: &mut Population, config: &SimConfig, rng: &mut DetRng) -> usize {
    let mut deaths = 0;
    for h in population.handles() {
        let Some(atom) = population.get_mut(h) else {
            continue;
        };
        if lifecycle::decay(atom, config) {
            behavior::decide(population, h, config, rng);
        } else if let Some(dead) = population.remove(h) {
            trace!(id = dead.id, age = dead.age, "died");
            deaths += 1;
        }
    }
    deaths
}

impl App {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let rng = DetRng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// like new, but with a random source of your choice instead of one seeded from the config
    pub fn with_rng(config: SimConfig, mut rng: DetRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let (population, structures) = populate(&config, &mut rng)?;
        info!(
            atoms = population.len(),
            structures = structures.len(),
            seed = config.seed,
            "new world"
        );
        Self::from_parts(config, population, structures, 0, rng)
    }

    /// assembles an app from existing state, e.g. a loaded save
    pub fn from_parts(
        config: SimConfig,
        population: Population,
        structures: Vec<EvolvingStructure>,
        time: u64,
        rng: DetRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            population,
            structures,
            config,
            rng,
            time,
            last_report: time,
            report_every: 0,
            report_file: None,
        })
    }

    /// throws away the world and builds a fresh one, the random stream just continues
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let (population, structures) = populate(&self.config, &mut self.rng)?;
        self.population = population;
        self.structures = structures;
        self.time = 0;
        self.last_report = 0;
        info!(atoms = self.population.len(), "reset");
        Ok(())
    }

    pub fn population(&self) -> &Population {
        &self.population
    }
    pub fn structures(&self) -> &[EvolvingStructure] {
        &self.structures
    }
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
    pub fn time(&self) -> u64 {
        self.time
    }

    /// adds a structure, e.g. one built from outside
    pub fn add_structure(&mut self, structure: EvolvingStructure) {
        self.structures.push(structure);
    }

    pub fn snapshot(&self) -> Frame {
        Frame::new(self.time, &self.population, &self.structures)
    }

    /// runs a single tick.
    ///
    /// removals and births are only committed between the phases,
    /// so handles stay valid throughout a phase.
    pub fn update(&mut self) -> TickSummary {
        self.time += 1;
        let mut summary = TickSummary {
            tick: self.time,
            ..TickSummary::default()
        };
        let Self {
            population,
            structures,
            config,
            rng,
            ..
        } = self;
        let config = &*config;

        forces::apply(population, config);
        match config.cadence {
            TickCadence::Reference => {
                interaction_sweep(population, config, rng, &mut summary);
                population.commit();

                collision::resolve_all(population, config);

                summary.deaths = decay_and_decide(population, config, rng);
                population.commit();

                for h in population.handles() {
                    behavior::decide(population, h, config, rng);
                    if let Some(atom) = population.get_mut(h) {
                        atom.update_position(config);
                    }
                }
                population.commit();

                for s in structures.iter_mut() {
                    s.grow();
                    s.grow();
                }
            }
            TickCadence::Single => {
                collision::resolve_all(population, config);

                summary.deaths = lifecycle::advance(population, config);

                for h in population.handles() {
                    behavior::decide(population, h, config, rng);
                    if behavior::eat(population, h, config) {
                        summary.meals += 1;
                    }
                    reproduce(population, h, config, &mut summary);
                }
                population.commit();

                population.slots_mut().par_iter_mut().for_each(|slot| {
                    if let Some(atom) = slot {
                        atom.update_position(config);
                    }
                });

                for s in structures.iter_mut() {
                    s.grow();
                }
            }
        }
        summary.population = population.len();
        debug!(?summary, "tick");

        if self.report_file.is_some() && self.time - self.last_report >= self.report_every {
            if let Err(e) = self.write_report() {
                warn!("could not write report: {e}");
            }
            self.last_report = self.time;
        }
        summary
    }

    /// runs a number of ticks, the summary adds up births, deaths and meals
    pub fn run(&mut self, ticks: u64) -> TickSummary {
        let mut total = TickSummary {
            tick: self.time,
            population: self.population.len(),
            ..TickSummary::default()
        };
        for _ in 0..ticks {
            total.absorb(self.update());
        }
        total
    }

    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            tick: self.time,
            structures: self.structures.len(),
            ..PopulationStats::default()
        };
        let mut total_age = 0;
        for atom in self.population.atoms() {
            match atom.species() {
                Species::Red => stats.red += 1,
                Species::Blue => stats.blue += 1,
                Species::Food => stats.food += 1,
            }
            total_age += atom.age;
        }
        let count = stats.red + stats.blue + stats.food;
        if count > 0 {
            stats.average_age = total_age as f64 / count as f64;
        }
        stats.oldest = Selection::Oldest
            .select(&self.population, [0.; 2])
            .and_then(|h| self.population.get(h))
            .map_or(0, |a| a.age);
        stats
    }

    pub fn report(&self) {
        let s = self.stats();
        if s.red + s.blue + s.food == 0 {
            info!(tick = s.tick, "no atoms at all");
            return;
        }
        info!(
            tick = s.tick,
            red = s.red,
            blue = s.blue,
            food = s.food,
            average_age = s.average_age,
            oldest = s.oldest,
            structures = s.structures,
            "report"
        );
    }

    /// appends csv rows to `file` every `every` ticks from now on, starting with a header
    pub fn report_to(&mut self, mut file: std::fs::File, every: u64) -> std::io::Result<()> {
        file.write_all(b"tick, red, blue, food, average_age, oldest, structures\n")?;
        self.report_file = Some(file);
        self.report_every = every.max(1);
        self.last_report = self.time;
        Ok(())
    }

    // takes &mut for the file write
    pub fn write_report(&mut self) -> std::io::Result<()> {
        let s = self.stats();
        if let Some(file) = self.report_file.as_mut() {
            let line = format!(
                "{}, {}, {}, {}, {}, {}, {}\n",
                s.tick, s.red, s.blue, s.food, s.average_age, s.oldest, s.structures
            );
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}

impl PartialEq for App {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
            && self.population == other.population
            && self.structures == other.structures
            && self.rng == other.rng
    }
}

#[cfg(test)]
fn small(cadence: TickCadence) -> SimConfig {
    SimConfig {
        seed: 1234,
        cadence,
        atoms: 40,
        food: 20,
        world_size: 300.,
        ..SimConfig::default()
    }
}

#[test]
fn determinism() {
    for cadence in [TickCadence::Reference, TickCadence::Single] {
        let mut app1 = App::new(small(cadence)).unwrap();
        let mut app2 = App::new(small(cadence)).unwrap();
        for _ in 0..300 {
            let s1 = app1.update();
            let s2 = app2.update();
            assert_eq!(s1, s2);
            assert_eq!(app1, app2);
        }
    }
}

#[test]
fn seeds_matter() {
    let app1 = App::new(small(TickCadence::Reference)).unwrap();
    let app2 = App::with_rng(small(TickCadence::Reference), DetRng::seed_from_u64(99)).unwrap();
    assert!(app1 != app2);
}

#[test]
fn initial_world() {
    let config = SimConfig::default();
    let app = App::new(config.clone()).unwrap();
    let stats = app.stats();
    assert_eq!(stats.red + stats.blue, config.atoms);
    assert_eq!(stats.food, config.food);
    assert_eq!(stats.structures, config.structures + 1);
    assert_eq!(app.structures()[0].pos, ANCHOR);
    let ids: Vec<u64> = app.population().atoms().map(|a| a.id).collect();
    assert_eq!(ids, (0..(config.atoms + config.food) as u64).collect::<Vec<_>>());
    for a in app.population().atoms() {
        assert!(a.pos[0] >= 0. && a.pos[0] <= config.world_size);
        assert!(a.vel[0].abs() <= config.initial_speed);
        if a.species().is_food() {
            assert_eq!(a.charge, 0.);
            assert_eq!(a.vel, [0., 0.]);
        }
    }
}

#[test]
fn rejects_invalid_config() {
    let config = SimConfig {
        atom_mass: -1.,
        ..SimConfig::default()
    };
    assert!(matches!(App::new(config), Err(ConfigError::Invalid(_))));
}

#[test]
fn ticks_keep_invariants() {
    for cadence in [TickCadence::Reference, TickCadence::Single] {
        let config = small(cadence);
        let mut app = App::new(config.clone()).unwrap();
        for _ in 0..200 {
            let summary = app.update();
            assert_eq!(summary.population, app.population().len());
            assert_eq!(app.population().pending_births(), 0);
            for a in app.population().atoms() {
                assert!(a.mass() > 0.);
                assert!(a.pos[0] >= 0. && a.pos[0] <= config.world_size);
                assert!(a.pos[1] >= 0. && a.pos[1] <= config.world_size);
                if cadence == TickCadence::Single {
                    // in the reference cadence later bounces can still push earlier atoms
                    assert!(a.vel[0].abs() <= config.max_velocity);
                }
                assert!(a.trail.len() <= config.trail_length);
                assert!(a.cooldown >= 0.);
            }
        }
        assert_eq!(app.time(), 200);
    }
}

#[test]
fn cadence_sets_structure_growth() {
    let mut reference = App::new(small(TickCadence::Reference)).unwrap();
    let mut single = App::new(small(TickCadence::Single)).unwrap();
    reference.update();
    single.update();
    assert!((reference.structures()[0].size() - 20.199).abs() < 1e-12);
    assert!((single.structures()[0].size() - 20.1).abs() < 1e-12);
}

#[test]
fn reference_cadence_steps_twice() {
    use crate::atom::test_atom;

    let ticked = |cadence| {
        let config = SimConfig {
            atoms: 0,
            food: 0,
            structures: 0,
            ..small(cadence)
        };
        let mut app = App::new(config).unwrap();
        let mut red = test_atom([100., 100.], Species::Red);
        red.cooldown = 10.;
        app.population.spawn(red);
        // overlapping, gets eaten in the first pass over the atoms
        app.population.spawn(test_atom([103., 100.], Species::Food));
        let summary = app.update();
        let atom = app.population().atoms().next().unwrap().clone();
        (summary, atom)
    };

    let (summary, atom) = ticked(TickCadence::Reference);
    assert_eq!(summary.meals, 1);
    assert_eq!(summary.population, 1);
    assert_eq!(atom.cooldown, 8.);
    assert_eq!(atom.trail.len(), 2);

    let (summary, atom) = ticked(TickCadence::Single);
    assert_eq!(summary.meals, 1);
    assert_eq!(atom.cooldown, 9.);
    assert_eq!(atom.trail.len(), 1);
}

#[test]
fn added_structures_grow_and_show() {
    let mut app = App::new(small(TickCadence::Single)).unwrap();
    let before = app.structures().len();
    app.add_structure(EvolvingStructure::new([10., 20.], 5., 1.).unwrap());
    app.update();
    assert_eq!(app.structures().len(), before + 1);
    let added = &app.structures()[before];
    assert_eq!(added.size(), 6.);
    assert_eq!(added.age, 1);
    let frame = app.snapshot();
    assert_eq!(frame.structures.len(), before + 1);
}

#[test]
fn empty_world() {
    let config = SimConfig {
        atoms: 0,
        food: 0,
        structures: 0,
        ..SimConfig::default()
    };
    let mut app = App::new(config).unwrap();
    let summary = app.run(10);
    assert_eq!(summary.tick, 10);
    assert_eq!(summary.population, 0);
    let stats = app.stats();
    assert_eq!(stats.average_age, 0.);
    assert_eq!(stats.oldest, 0);
    assert_eq!(stats.structures, 1);
    app.report();
}

#[test]
fn run_adds_up() {
    let mut app1 = App::new(small(TickCadence::Reference)).unwrap();
    let mut app2 = App::new(small(TickCadence::Reference)).unwrap();
    let start = app1.population().len();
    let total = app1.run(50);
    let mut births = 0;
    let mut deaths = 0;
    let mut meals = 0;
    for _ in 0..50 {
        let s = app2.update();
        births += s.births;
        deaths += s.deaths;
        meals += s.meals;
    }
    assert_eq!(total.tick, 50);
    assert_eq!((total.births, total.deaths, total.meals), (births, deaths, meals));
    assert_eq!(total.population, start + births - deaths - meals);
}

#[test]
fn reset_rebuilds() {
    let config = small(TickCadence::Single);
    let mut app = App::new(config.clone()).unwrap();
    app.run(20);
    app.reset().unwrap();
    assert_eq!(app.time(), 0);
    assert_eq!(app.population().len(), config.atoms + config.food);
    assert_eq!(app.structures().len(), config.structures + 1);
    assert_eq!(app.structures()[0].size(), config.structure_size);
}

#[test]
fn csv_report() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut app = App::new(small(TickCadence::Single)).unwrap();
    app.report_to(file.reopen().unwrap(), 10).unwrap();
    app.run(25);
    let text = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("tick, red"));
    assert!(lines[1].starts_with("10, "));
    assert!(lines[2].starts_with("20, "));
}
