use std::collections::HashSet;

use bavet_core::{BavetError, Fact, Result, Score};

use super::join::JoinerSet;
use super::{copy_facts, install, not_inserted, OutputQueue, Propagation, Side};
use crate::index::{IndexKeys, Indexer};
use crate::stream::Joiner;
use crate::tuple::{Facts, Slot, TupleArena, TupleId};

/// Passes a left tuple through while at least one (`if_exists`) or no
/// (`if_not_exists`) right tuple matches it.
///
/// Both sides keep explicit partner lists in their slots: a left tuple knows
/// which rights it is counted against and a right tuple knows which lefts it
/// counts for, so any retract or update touches exactly the affected pairs.
pub(crate) struct ExistsNode<F: Fact> {
    origin: String,
    left_slot: usize,
    right_slot: usize,
    should_exist: bool,
    joiners: JoinerSet<F>,
    left_index: Indexer<F, TupleId>,
    right_index: Indexer<F, TupleId>,
}

impl<F: Fact> ExistsNode<F> {
    pub(crate) fn new(
        origin: String,
        left_slot: usize,
        right_slot: usize,
        joiners: &[Joiner<F>],
        should_exist: bool,
    ) -> Self {
        let joiners = JoinerSet::new(joiners);
        let depth = joiners.depth();
        Self {
            origin,
            left_slot,
            right_slot,
            should_exist,
            joiners,
            left_index: Indexer::new(depth),
            right_index: Indexer::new(depth),
        }
    }

    pub(crate) fn should_exist(&self) -> bool {
        self.should_exist
    }

    pub(crate) fn indexed(&self) -> (usize, usize) {
        (self.left_index.len(), self.right_index.len())
    }

    fn passes(&self, matches: usize) -> bool {
        (matches > 0) == self.should_exist
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match side {
            Side::Left => self.insert_left(tuple, out, cx.tuples),
            Side::Right => self.insert_right(tuple, out, cx.tuples),
        }
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match side {
            Side::Left => self.update_left(tuple, out, cx.tuples),
            Side::Right => self.update_right(tuple, out, cx.tuples),
        }
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match side {
            Side::Left => self.retract_left(tuple, out, cx.tuples),
            Side::Right => self.retract_right(tuple, out, cx.tuples),
        }
    }

    /// Right tuples under `keys` that pass the residual filters against `left`.
    fn matching_rights(
        &self,
        keys: &IndexKeys<F>,
        left: &[F],
        tuples: &TupleArena<F>,
    ) -> Result<Vec<TupleId>> {
        let mut rights = Vec::new();
        for right in self.right_index.matching(keys)? {
            if self.joiners.accepts(&self.origin, left, tuples.facts(right)?)? {
                rights.push(right);
            }
        }
        Ok(rights)
    }

    fn matching_lefts(
        &self,
        keys: &IndexKeys<F>,
        right: &[F],
        tuples: &TupleArena<F>,
    ) -> Result<Vec<TupleId>> {
        let mut lefts = Vec::new();
        for left in self.left_index.matching(keys)? {
            if self.joiners.accepts(&self.origin, tuples.facts(left)?, right)? {
                lefts.push(left);
            }
        }
        Ok(lefts)
    }

    fn insert_left(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let mine = copy_facts(tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, Side::Left, &mine)?;
        self.left_index.put(&keys, tuple)?;
        let rights = self.matching_rights(&keys, &mine, tuples)?;
        for &right in &rights {
            self.counted_lefts(right, tuples)?.push(tuple);
        }
        let emitted = if self.passes(rights.len()) {
            Some(out.insert(tuples, mine))
        } else {
            None
        };
        install(
            tuples,
            tuple,
            self.left_slot,
            Slot::ExistsLeft {
                keys,
                rights,
                out: emitted,
            },
        )
    }

    fn update_left(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let (old_keys, old_rights, emitted) = match tuples.take_slot(tuple, self.left_slot)? {
            Slot::ExistsLeft { keys, rights, out } => (keys, rights, out),
            other => return Err(not_inserted(tuple, &other)),
        };
        for right in old_rights {
            remove_entry(self.counted_lefts(right, tuples)?, tuple)?;
        }

        let mine = copy_facts(tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, Side::Left, &mine)?;
        if keys != old_keys {
            self.left_index.remove(&old_keys, tuple)?;
            self.left_index.put(&keys, tuple)?;
        }
        let rights = self.matching_rights(&keys, &mine, tuples)?;
        for &right in &rights {
            self.counted_lefts(right, tuples)?.push(tuple);
        }

        let emitted = match (emitted, self.passes(rights.len())) {
            (Some(child), true) => {
                out.refresh(tuples, child, mine)?;
                Some(child)
            }
            (Some(child), false) => {
                out.retract(tuples, child)?;
                None
            }
            (None, true) => Some(out.insert(tuples, mine)),
            (None, false) => None,
        };
        tuples.set_slot(
            tuple,
            self.left_slot,
            Slot::ExistsLeft {
                keys,
                rights,
                out: emitted,
            },
        )
    }

    fn retract_left(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let (keys, rights, emitted) = match tuples.take_slot(tuple, self.left_slot)? {
            Slot::ExistsLeft { keys, rights, out } => (keys, rights, out),
            other => return Err(not_inserted(tuple, &other)),
        };
        self.left_index.remove(&keys, tuple)?;
        for right in rights {
            remove_entry(self.counted_lefts(right, tuples)?, tuple)?;
        }
        match emitted {
            Some(child) => out.retract(tuples, child),
            None => Ok(()),
        }
    }

    fn insert_right(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let theirs = copy_facts(tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, Side::Right, &theirs)?;
        self.right_index.put(&keys, tuple)?;
        let lefts = self.matching_lefts(&keys, &theirs, tuples)?;
        for &left in &lefts {
            self.add_right(left, tuple, out, tuples)?;
        }
        install(tuples, tuple, self.right_slot, Slot::ExistsRight { keys, lefts })
    }

    fn update_right(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let (old_keys, old_lefts) = match tuples.take_slot(tuple, self.right_slot)? {
            Slot::ExistsRight { keys, lefts } => (keys, lefts),
            other => return Err(not_inserted(tuple, &other)),
        };
        let theirs = copy_facts(tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, Side::Right, &theirs)?;
        if keys != old_keys {
            self.right_index.remove(&old_keys, tuple)?;
            self.right_index.put(&keys, tuple)?;
        }
        let lefts = self.matching_lefts(&keys, &theirs, tuples)?;

        let kept: HashSet<TupleId> = lefts.iter().copied().collect();
        let previous: HashSet<TupleId> = old_lefts.iter().copied().collect();
        for &left in old_lefts.iter().filter(|left| !kept.contains(left)) {
            self.remove_right(left, tuple, out, tuples)?;
        }
        for &left in lefts.iter().filter(|left| !previous.contains(left)) {
            self.add_right(left, tuple, out, tuples)?;
        }
        tuples.set_slot(tuple, self.right_slot, Slot::ExistsRight { keys, lefts })
    }

    fn retract_right(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        let (keys, lefts) = match tuples.take_slot(tuple, self.right_slot)? {
            Slot::ExistsRight { keys, lefts } => (keys, lefts),
            other => return Err(not_inserted(tuple, &other)),
        };
        self.right_index.remove(&keys, tuple)?;
        for left in lefts {
            self.remove_right(left, tuple, out, tuples)?;
        }
        Ok(())
    }

    /// The lefts a right tuple is counted for.
    fn counted_lefts<'t>(
        &self,
        right: TupleId,
        tuples: &'t mut TupleArena<F>,
    ) -> Result<&'t mut Vec<TupleId>> {
        match tuples.slot_mut(right, self.right_slot)? {
            Slot::ExistsRight { lefts, .. } => Ok(lefts),
            other => Err(not_inserted(right, other)),
        }
    }

    fn add_right(
        &self,
        left: TupleId,
        right: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match tuples.slot_mut(left, self.left_slot)? {
            Slot::ExistsLeft { rights, .. } => rights.push(right),
            other => return Err(not_inserted(left, other)),
        }
        self.sync(left, out, tuples)
    }

    fn remove_right(
        &self,
        left: TupleId,
        right: TupleId,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match tuples.slot_mut(left, self.left_slot)? {
            Slot::ExistsLeft { rights, .. } => remove_entry(rights, right)?,
            other => return Err(not_inserted(left, other)),
        }
        self.sync(left, out, tuples)
    }

    /// Emits or retracts a left tuple's output after its match count changed.
    fn sync(&self, left: TupleId, out: &mut OutputQueue, tuples: &mut TupleArena<F>) -> Result<()> {
        let (count, emitted) = match tuples.slot_mut(left, self.left_slot)? {
            Slot::ExistsLeft {
                rights,
                out: current,
                ..
            } => (rights.len(), *current),
            other => return Err(not_inserted(left, other)),
        };
        let emitted = match (emitted, self.passes(count)) {
            (None, true) => {
                let facts: Facts<F> = copy_facts(tuples, left)?;
                Some(out.insert(tuples, facts))
            }
            (Some(child), false) => {
                out.retract(tuples, child)?;
                None
            }
            _ => return Ok(()),
        };
        if let Slot::ExistsLeft { out: current, .. } = tuples.slot_mut(left, self.left_slot)? {
            *current = emitted;
        }
        Ok(())
    }
}

fn remove_entry(entries: &mut Vec<TupleId>, entry: TupleId) -> Result<()> {
    match entries.iter().position(|e| *e == entry) {
        Some(position) => {
            entries.swap_remove(position);
            Ok(())
        }
        None => Err(BavetError::illegal_state(format!(
            "{:?} is not a recorded exists partner",
            entry
        ))),
    }
}
