//! Atomherd is a deterministic particle life simulation
//!
//! ## Particles
//! The world is a square box. Inside it float a bunch of atoms, little discs with a
//! position, a velocity, a mass and a charge.
//! There are two species of agents, red and blue, and there is food.
//!
//! Atoms pull on each other through gravity and push or pull through their charges,
//! opposite charges attract, like charges repel. When two atoms overlap they bounce off each
//! other, losing a bit of energy in the process.
//!
//! ## Life
//! Agents get hungry and tired over time, and if either runs out they start losing health.
//! At zero health they die. Food is eaten on contact and fills hunger and energy back up.
//!
//! Every tick each atom decides what to do: flee when hurt, look for food when hungry,
//! look for a partner of its own species when healthy, or chase whatever is weaker than itself.
//! Two partners produce a child that mixes both of them, and it is always heavier than either
//! parent.
//!
//! ## Deterministic
//! Given the same configuration and seed, two runs produce exactly the same results,
//! even though the heavy parts run in parallel.
//! Saving and loading keeps that property, a loaded simulation continues exactly like the
//! one that was saved.

// The interesting bit is App::update() in the app module, it runs the phases of a tick
// in order: forces, collisions, lifecycle, behavior, movement.
// The phases themselves live in their own modules (forces, collision, lifecycle, behavior)
// and all work on the Population arena.
// If you just want to change some numbers have a look at the config module.

pub mod config;

pub mod vecmath;

pub mod atom;
pub use atom::{Atom, Species};

pub mod population;
pub use population::Population;

pub mod forces;

pub mod collision;

pub mod behavior;

pub mod lifecycle;

pub mod structure;
pub use structure::EvolvingStructure;

pub mod select;
pub use select::Selection;

pub mod snapshot;

pub mod app;
pub use app::App;

pub mod persist;

#[cfg(test)]
mod tests;
