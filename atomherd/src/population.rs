use crate::atom::Atom;

/// all atoms of the simulation.
///
/// a vec-like arena where removes do not disturb the indices (handles) of other atoms,
/// basically Vec<Option<Atom>>.
/// removals leave a hole and births wait in a separate buffer,
/// both only become visible to the structure on commit().
/// handles are therefore stable in between two commits, and iteration order is always
/// ascending by handle, which is the same as ascending by creation.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Population {
    slots: Vec<Option<Atom>>,
    births: Vec<Atom>,
    next_id: u64,
}

/// what changed during a commit
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub removed: usize,
    pub added: usize,
}

impl Population {
    pub fn with_capacity(c: usize) -> Self {
        Self {
            slots: Vec::with_capacity(c),
            births: Vec::new(),
            next_id: 0,
        }
    }

    /// rebuilds a population from atoms that already carry ids, keeping their order
    pub fn from_atoms(atoms: Vec<Atom>, next_id: u64) -> Self {
        let next_id = atoms
            .iter()
            .map(|a| a.id + 1)
            .max()
            .unwrap_or(0)
            .max(next_id);
        Self {
            slots: atoms.into_iter().map(Some).collect(),
            births: Vec::new(),
            next_id,
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    fn assign_id(&mut self, atom: &mut Atom) -> u64 {
        atom.id = self.next_id;
        self.next_id += 1;
        atom.id
    }

    /// inserts right away, only call this between passes.
    /// returns the id of the new atom
    pub fn spawn(&mut self, mut atom: Atom) -> u64 {
        let id = self.assign_id(&mut atom);
        self.slots.push(Some(atom));
        id
    }

    /// buffers a new atom, it shows up after the next commit
    pub fn queue_birth(&mut self, mut atom: Atom) -> u64 {
        let id = self.assign_id(&mut atom);
        self.births.push(atom);
        id
    }

    /// panics on oob
    /// returns the atom if one was alive at the position
    pub fn remove(&mut self, handle: usize) -> Option<Atom> {
        self.slots[handle].take()
    }

    pub fn get(&self, handle: usize) -> Option<&Atom> {
        self.slots.get(handle).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut Atom> {
        self.slots.get_mut(handle).and_then(Option::as_mut)
    }

    /// mutable access to two different live atoms at once
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Atom, &mut Atom)> {
        if a == b || a.max(b) >= self.slots.len() {
            return None;
        }
        let (low, high) = (a.min(b), a.max(b));
        let (left, right) = self.slots.split_at_mut(high);
        let low = left[low].as_mut()?;
        let high = right[0].as_mut()?;
        if a < b { Some((low, high)) } else { Some((high, low)) }
    }

    /// number of handles, including the dead ones
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// i don't wanna implement parallel iterator
    pub fn slots_mut(&mut self) -> &mut [Option<Atom>] {
        &mut self.slots
    }
    pub fn slots(&self) -> &[Option<Atom>] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Atom)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, e)| e.as_mut().map(|e| (i, e)))
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.slots.iter().flatten()
    }

    /// handles of all live atoms at this moment
    pub fn handles(&self) -> Vec<usize> {
        self.iter().map(|(i, _)| i).collect()
    }

    /// this is O(n)
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_births(&self) -> usize {
        self.births.len()
    }

    /// drops all holes and appends the buffered births.
    /// this modifies the handle of every atom after the first hole
    pub fn commit(&mut self) -> Commit {
        let before = self.slots.len();
        self.slots.retain(Option::is_some);
        let removed = before - self.slots.len();
        let added = self.births.len();
        self.slots.extend(self.births.drain(..).map(Some));
        Commit { removed, added }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.births.clear();
    }

    /// all live atoms followed by the pending births
    pub fn to_atoms(&self) -> Vec<Atom> {
        self.atoms().chain(&self.births).cloned().collect()
    }
}
