use crate::atom::{Atom, AtomError};
use crate::vecmath::Vector;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// growth slows down by this factor every tick
pub const GROWTH_DECAY: f64 = 0.99;

#[derive(Error, Debug, PartialEq)]
pub enum StructureError {
    #[error("structure size must be positive, got {0}")]
    NonPositiveSize(f64),
    #[error("growth rate must not be negative, got {0}")]
    NegativeGrowth(f64),
    #[error("structure holds an invalid atom: {0}")]
    Atom(#[from] AtomError),
}

/// a slowly growing site that owns a few atoms of its own.
/// purely decorative, the simulation never moves atoms in or out of it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EvolvingStructure {
    pub pos: Vector,
    size: f64,
    growth_rate: f64,
    pub age: u64,
    atoms: Vec<Atom>,
}

impl EvolvingStructure {
    pub fn new(pos: Vector, size: f64, growth_rate: f64) -> Result<Self, StructureError> {
        let s = Self {
            pos,
            size,
            growth_rate,
            age: 0,
            atoms: Vec::new(),
        };
        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<(), StructureError> {
        if !(self.size > 0. && self.size.is_finite()) {
            return Err(StructureError::NonPositiveSize(self.size));
        }
        if !(self.growth_rate >= 0. && self.growth_rate.is_finite()) {
            return Err(StructureError::NegativeGrowth(self.growth_rate));
        }
        for atom in &self.atoms {
            atom.validate()?;
        }
        Ok(())
    }

    pub fn size(&self) -> f64 {
        self.size
    }
    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn add_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// grows itself and all its atoms, then slows down its growth
    pub fn grow(&mut self) {
        self.size += self.growth_rate;
        for atom in self.atoms.iter_mut() {
            atom.grow(self.growth_rate);
        }
        self.age += 1;
        self.growth_rate *= GROWTH_DECAY;
    }
}
