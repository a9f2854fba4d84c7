//! Generational slab of tuples.

use bavet_core::{BavetError, Result};

use super::{Facts, Slot, Tuple, TupleId, TupleState};

enum Entry<F> {
    Occupied { generation: u32, tuple: Tuple<F> },
    Vacant { generation: u32 },
}

/// Owns every tuple of a session.
///
/// Freed entries are recycled through a free list; their generation is bumped
/// so ids issued for the previous occupant no longer resolve.
pub struct TupleArena<F> {
    entries: Vec<Entry<F>>,
    free: Vec<u32>,
    live: usize,
}

impl<F> Default for TupleArena<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> TupleArena<F> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Allocates a tuple in the `Creating` state with `store_size` empty slots.
    pub(crate) fn alloc(&mut self, facts: Facts<F>, store_size: usize) -> TupleId {
        let tuple = Tuple {
            facts,
            state: TupleState::Creating,
            store: (0..store_size).map(|_| Slot::Empty).collect(),
        };
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                let generation = match entry {
                    Entry::Vacant { generation } => *generation,
                    Entry::Occupied { generation, .. } => *generation,
                };
                *entry = Entry::Occupied { generation, tuple };
                TupleId::new(index, generation)
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry::Occupied {
                    generation: 0,
                    tuple,
                });
                TupleId::new(index, 0)
            }
        }
    }

    /// Frees a tuple. Its id, and every copy of it, stops resolving.
    pub(crate) fn free(&mut self, id: TupleId) -> Result<Tuple<F>> {
        let generation = match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, .. }) if *generation == id.generation() => {
                *generation
            }
            _ => return Err(unknown(id)),
        };
        let vacant = Entry::Vacant {
            generation: generation.wrapping_add(1),
        };
        match std::mem::replace(&mut self.entries[id.index()], vacant) {
            Entry::Occupied { tuple, .. } => {
                self.free.push(id.index);
                self.live -= 1;
                Ok(tuple)
            }
            Entry::Vacant { .. } => Err(unknown(id)),
        }
    }

    /// Looks up a live tuple.
    pub fn get(&self, id: TupleId) -> Result<&Tuple<F>> {
        match self.entries.get(id.index()) {
            Some(Entry::Occupied { generation, tuple }) if *generation == id.generation() => {
                Ok(tuple)
            }
            _ => Err(unknown(id)),
        }
    }

    pub(crate) fn get_mut(&mut self, id: TupleId) -> Result<&mut Tuple<F>> {
        match self.entries.get_mut(id.index()) {
            Some(Entry::Occupied { generation, tuple }) if *generation == id.generation() => {
                Ok(tuple)
            }
            _ => Err(unknown(id)),
        }
    }

    /// Returns the facts of a live tuple.
    #[inline]
    pub fn facts(&self, id: TupleId) -> Result<&[F]> {
        self.get(id).map(Tuple::facts)
    }

    /// Returns true if `id` refers to a live tuple.
    pub fn contains(&self, id: TupleId) -> bool {
        self.get(id).is_ok()
    }

    /// Takes a slot out of a tuple, leaving [`Slot::Empty`] behind.
    pub(crate) fn take_slot(&mut self, id: TupleId, slot: usize) -> Result<Slot<F>> {
        let tuple = self.get_mut(id)?;
        let entry = tuple
            .store
            .get_mut(slot)
            .ok_or_else(|| BavetError::illegal_state(format!("{:?} has no slot {}", id, slot)))?;
        Ok(std::mem::replace(entry, Slot::Empty))
    }

    pub(crate) fn slot_mut(&mut self, id: TupleId, slot: usize) -> Result<&mut Slot<F>> {
        let tuple = self.get_mut(id)?;
        tuple
            .store
            .get_mut(slot)
            .ok_or_else(|| BavetError::illegal_state(format!("{:?} has no slot {}", id, slot)))
    }

    pub(crate) fn set_slot(&mut self, id: TupleId, slot: usize, value: Slot<F>) -> Result<()> {
        *self.slot_mut(id, slot)? = value;
        Ok(())
    }

    /// Number of live tuples.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no tuple is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of entries ever allocated, live or recycled.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Iterates live tuples with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (TupleId, &Tuple<F>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Entry::Occupied { generation, tuple } => {
                    Some((TupleId::new(index as u32, *generation), tuple))
                }
                Entry::Vacant { .. } => None,
            })
    }
}

fn unknown(id: TupleId) -> BavetError {
    BavetError::illegal_state(format!("{:?} is not a live tuple", id))
}
