//! saving and loading whole simulations.
//!
//! the on-disk format is bincode with serde, nothing else is meant to read it.
//! everything coming back from disk is validated before it becomes an [`App`],
//! the invariants of atoms and structures do not survive a trip through a file by themselves.

use crate::app::{App, DetRng};
use crate::atom::{Atom, AtomError};
use crate::config::{ConfigError, SimConfig};
use crate::population::Population;
use crate::structure::{EvolvingStructure, StructureError};

use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("refusing to touch {0:?}")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("could not encode state: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("could not decode state: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("atom {index} is invalid: {source}")]
    InvalidAtom { index: usize, source: AtomError },
    #[error("structure {index} is invalid: {source}")]
    InvalidStructure {
        index: usize,
        source: StructureError,
    },
    #[error("atom id {0} is used more than once")]
    DuplicateId(u64),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SaveState {
    time: u64,
    atoms: Vec<Atom>,
    structures: Vec<EvolvingStructure>,
    next_id: u64,
    rng: DetRng,
}

impl SaveState {
    fn pack(app: &App) -> Self {
        Self {
            time: app.time,
            atoms: app.population.to_atoms(),
            structures: app.structures.clone(),
            next_id: app.population.next_id(),
            rng: app.rng.clone(),
        }
    }

    fn validate(&self) -> Result<(), PersistError> {
        let mut ids = HashSet::with_capacity(self.atoms.len());
        for (index, atom) in self.atoms.iter().enumerate() {
            atom.validate()
                .map_err(|source| PersistError::InvalidAtom { index, source })?;
            if !ids.insert(atom.id) {
                return Err(PersistError::DuplicateId(atom.id));
            }
        }
        for (index, s) in self.structures.iter().enumerate() {
            s.validate()
                .map_err(|source| PersistError::InvalidStructure { index, source })?;
        }
        Ok(())
    }

    fn unpack(self, config: SimConfig) -> Result<App, PersistError> {
        if let Err(e) = self.validate() {
            warn!("rejecting saved state: {e}");
            return Err(e);
        }
        let population = Population::from_atoms(self.atoms, self.next_id);
        let app = App::from_parts(config, population, self.structures, self.time, self.rng)?;
        Ok(app)
    }
}

/// rejects anything that could escape the working directory or confuse the os
/// before a single file is opened
pub fn check_path(path: &Path) -> Result<(), PersistError> {
    let reject = || Err(PersistError::InvalidPath(path.to_path_buf()));
    let text = path.to_string_lossy();
    if text.is_empty() || text.contains('\0') {
        return reject();
    }
    // windows style separators are not components on unix, check the text as well
    if text.contains("../") || text.contains("..\\") || text == ".." {
        return reject();
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return reject();
    }
    Ok(())
}

impl App {
    pub fn new_from<R: std::io::Read>(mut r: R, config: SimConfig) -> Result<Self, PersistError> {
        let state: SaveState =
            bincode::serde::decode_from_std_read(&mut r, bincode::config::standard())?;
        state.unpack(config)
    }

    pub fn write_into<W: std::io::Write>(
        &self,
        mut w: W,
    ) -> Result<usize, bincode::error::EncodeError> {
        bincode::serde::encode_into_std_write(
            &SaveState::pack(self),
            &mut w,
            bincode::config::standard(),
        )
    }
}

pub fn save(app: &App, path: &Path) -> Result<(), PersistError> {
    check_path(path)?;
    let mut w = BufWriter::new(File::create(path)?);
    let bytes = app.write_into(&mut w)?;
    w.flush()?;
    info!(?path, bytes, tick = app.time(), "saved");
    Ok(())
}

pub fn load(path: &Path, config: SimConfig) -> Result<App, PersistError> {
    check_path(path)?;
    let r = BufReader::new(File::open(path)?);
    let app = App::new_from(r, config)?;
    info!(?path, tick = app.time(), atoms = app.population().len(), "loaded");
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickCadence;

    fn config() -> SimConfig {
        SimConfig {
            seed: 77,
            cadence: TickCadence::Reference,
            atoms: 30,
            food: 15,
            world_size: 250.,
            ..SimConfig::default()
        }
    }

    #[test]
    fn round_trip_continues_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");

        let mut app = App::new(config()).unwrap();
        app.run(40);
        save(&app, &path).unwrap();
        let mut loaded = load(&path, config()).unwrap();
        assert_eq!(loaded, app);
        for (a, b) in app.population().atoms().zip(loaded.population().atoms()) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.vel, b.vel);
            assert_eq!((a.hunger, a.energy, a.health), (b.hunger, b.energy, b.health));
            assert_eq!(a.species(), b.species());
        }

        for _ in 0..40 {
            assert_eq!(app.update(), loaded.update());
        }
        assert_eq!(loaded, app);
    }

    #[test]
    fn ids_keep_counting_after_load() {
        let app = App::new(config()).unwrap();
        let mut buf = Vec::new();
        app.write_into(&mut buf).unwrap();
        let loaded = App::new_from(buf.as_slice(), config()).unwrap();
        assert_eq!(loaded.population().next_id(), app.population().next_id());
    }

    #[test]
    fn traversal_is_rejected() {
        let bad = ["", "../state.bin", "a/../../b", "..\\state.bin", "..", "a\0b"];
        for p in bad {
            let p = Path::new(p);
            assert!(matches!(check_path(p), Err(PersistError::InvalidPath(_))), "{p:?}");
            let app = App::new(config()).unwrap();
            assert!(matches!(save(&app, p), Err(PersistError::InvalidPath(_))));
            assert!(matches!(load(p, config()), Err(PersistError::InvalidPath(_))));
        }
        check_path(Path::new("state.bin")).unwrap();
        check_path(Path::new("saves/..state.bin")).unwrap();
    }

    fn tampered(field: &str, value: serde_json::Value, structure: bool) -> Vec<u8> {
        let app = App::new(config()).unwrap();
        let mut state = SaveState::pack(&app);
        if structure {
            let mut json = serde_json::to_value(&state.structures[1]).unwrap();
            json[field] = value;
            state.structures[1] = serde_json::from_value(json).unwrap();
        } else {
            let mut json = serde_json::to_value(&state.atoms[3]).unwrap();
            json[field] = value;
            state.atoms[3] = serde_json::from_value(json).unwrap();
        }
        bincode::serde::encode_to_vec(&state, bincode::config::standard()).unwrap()
    }

    #[test]
    fn non_positive_mass_is_rejected() {
        let bytes = tampered("mass", 0.into(), false);
        let err = App::new_from(bytes.as_slice(), config()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidAtom {
                index: 3,
                source: AtomError::NonPositiveMass(_)
            }
        ));

        let bytes = tampered("mass", (-2.5).into(), false);
        assert!(App::new_from(bytes.as_slice(), config()).is_err());
    }

    #[test]
    fn broken_vitals_are_rejected() {
        let bytes = tampered("cooldown", (-5.).into(), false);
        let err = App::new_from(bytes.as_slice(), config()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidAtom {
                index: 3,
                source: AtomError::NegativeCooldown(_)
            }
        ));

        let bytes = tampered("health", (-50.).into(), false);
        let err = App::new_from(bytes.as_slice(), config()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidAtom {
                index: 3,
                source: AtomError::NonPositiveHealth(_)
            }
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let bytes = tampered("id", 0.into(), false);
        let err = App::new_from(bytes.as_slice(), config()).unwrap_err();
        assert!(matches!(err, PersistError::DuplicateId(0)));
    }

    #[test]
    fn broken_structure_is_rejected() {
        let bytes = tampered("size", (-1.).into(), true);
        let err = App::new_from(bytes.as_slice(), config()).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidStructure {
                index: 1,
                source: StructureError::NonPositiveSize(_)
            }
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = App::new_from(&[0xffu8, 0xff, 0xff][..], config()).unwrap_err();
        assert!(matches!(err, PersistError::Decode(_)));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.bin"), config()).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
