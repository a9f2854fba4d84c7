use std::collections::HashMap;

use bavet_core::{Fact, Result, Score};

use super::{copy_facts, guard, install, not_inserted, OutputQueue, Propagation, Side};
use crate::index::{IndexKeys, Indexer};
use crate::stream::{Joiner, KeyFn, PairPredicate};
use crate::tuple::{Facts, Slot, TupleArena, TupleId};

/// Joiners split into index keys and residual filters.
pub(crate) struct JoinerSet<F> {
    left_keys: Vec<KeyFn<F>>,
    right_keys: Vec<KeyFn<F>>,
    filters: Vec<PairPredicate<F>>,
}

impl<F: Fact> JoinerSet<F> {
    pub(crate) fn new(joiners: &[Joiner<F>]) -> Self {
        let mut set = Self {
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            filters: Vec::new(),
        };
        for joiner in joiners {
            match joiner {
                Joiner::Equal { left, right } => {
                    set.left_keys.push(left.clone());
                    set.right_keys.push(right.clone());
                }
                Joiner::Filtering(predicate) => set.filters.push(predicate.clone()),
            }
        }
        set
    }

    /// Number of index levels.
    pub(crate) fn depth(&self) -> usize {
        self.left_keys.len()
    }

    pub(crate) fn keys(&self, origin: &str, side: Side, facts: &[F]) -> Result<IndexKeys<F>> {
        let extractors = match side {
            Side::Left => &self.left_keys,
            Side::Right => &self.right_keys,
        };
        if extractors.is_empty() {
            return Ok(IndexKeys::empty());
        }
        guard(origin, facts, || extractors.iter().map(|key| key(facts)).collect())
    }

    /// Applies the residual filters in declared order.
    pub(crate) fn accepts(&self, origin: &str, left: &[F], right: &[F]) -> Result<bool> {
        if self.filters.is_empty() {
            return Ok(true);
        }
        guard(origin, &(left, right), || {
            self.filters.iter().all(|filter| filter(left, right))
        })
    }
}

/// Orders `mine` and `theirs` as (left, right) for the side `mine` arrived on.
pub(crate) fn ordered<'a, F>(side: Side, mine: &'a [F], theirs: &'a [F]) -> (&'a [F], &'a [F]) {
    match side {
        Side::Left => (mine, theirs),
        Side::Right => (theirs, mine),
    }
}

/// Emits `left ++ right` for every pair of tuples with equal index keys that
/// passes the residual filters.
///
/// Each input tuple's slot records its index keys and every
/// `(partner, output)` pair it takes part in; the partner's slot records the
/// same pair, so either side can retract the output and unlink the other.
pub(crate) struct JoinNode<F: Fact> {
    origin: String,
    left_slot: usize,
    right_slot: usize,
    joiners: JoinerSet<F>,
    left_index: Indexer<F, TupleId>,
    right_index: Indexer<F, TupleId>,
}

impl<F: Fact> JoinNode<F> {
    pub(crate) fn new(
        origin: String,
        left_slot: usize,
        right_slot: usize,
        joiners: &[Joiner<F>],
    ) -> Self {
        let joiners = JoinerSet::new(joiners);
        let depth = joiners.depth();
        Self {
            origin,
            left_slot,
            right_slot,
            joiners,
            left_index: Indexer::new(depth),
            right_index: Indexer::new(depth),
        }
    }

    pub(crate) fn indexed(&self) -> (usize, usize) {
        (self.left_index.len(), self.right_index.len())
    }

    fn slot(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_slot,
            Side::Right => self.right_slot,
        }
    }

    fn index(&self, side: Side) -> &Indexer<F, TupleId> {
        match side {
            Side::Left => &self.left_index,
            Side::Right => &self.right_index,
        }
    }

    fn index_mut(&mut self, side: Side) -> &mut Indexer<F, TupleId> {
        match side {
            Side::Left => &mut self.left_index,
            Side::Right => &mut self.right_index,
        }
    }

    /// Evaluates the residual filters on one pair and returns its output facts.
    fn combine(
        &self,
        side: Side,
        mine: &[F],
        partner: TupleId,
        tuples: &TupleArena<F>,
    ) -> Result<Option<Facts<F>>> {
        let theirs = tuples.facts(partner)?;
        let (left, right) = ordered(side, mine, theirs);
        if !self.joiners.accepts(&self.origin, left, right)? {
            return Ok(None);
        }
        Ok(Some(left.iter().chain(right).cloned().collect()))
    }

    fn link(
        &self,
        side: Side,
        partner: TupleId,
        tuple: TupleId,
        child: TupleId,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match tuples.slot_mut(partner, self.slot(side.opposite()))? {
            Slot::Join { matches, .. } => {
                matches.push((tuple, child));
                Ok(())
            }
            other => Err(not_inserted(partner, other)),
        }
    }

    fn unlink(
        &self,
        side: Side,
        partner: TupleId,
        tuple: TupleId,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match tuples.slot_mut(partner, self.slot(side.opposite()))? {
            Slot::Join { matches, .. } => match matches.iter().position(|(p, _)| *p == tuple) {
                Some(position) => {
                    matches.swap_remove(position);
                    Ok(())
                }
                None => Err(bavet_core::BavetError::illegal_state(format!(
                    "{:?} is not joined with {:?}",
                    partner, tuple
                ))),
            },
            other => Err(not_inserted(partner, other)),
        }
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let mine = copy_facts(cx.tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, side, &mine)?;
        self.index_mut(side).put(&keys, tuple)?;
        let candidates = self.index(side.opposite()).matching(&keys)?;

        let mut matches = Vec::new();
        for partner in candidates {
            if let Some(facts) = self.combine(side, &mine, partner, cx.tuples)? {
                let child = out.insert(cx.tuples, facts);
                self.link(side, partner, tuple, child, cx.tuples)?;
                matches.push((partner, child));
            }
        }
        install(cx.tuples, tuple, self.slot(side), Slot::Join { keys, matches })
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let slot = self.slot(side);
        let (old_keys, old_matches) = match cx.tuples.take_slot(tuple, slot)? {
            Slot::Join { keys, matches } => (keys, matches),
            other => return Err(not_inserted(tuple, &other)),
        };
        let mine = copy_facts(cx.tuples, tuple)?;
        let keys = self.joiners.keys(&self.origin, side, &mine)?;
        if keys != old_keys {
            cx.tuples.set_slot(
                tuple,
                slot,
                Slot::Join {
                    keys: old_keys,
                    matches: old_matches,
                },
            )?;
            self.retract(side, tuple, out, cx)?;
            return self.insert(side, tuple, out, cx);
        }

        let mut existing: HashMap<TupleId, TupleId> = old_matches.into_iter().collect();
        let candidates = self.index(side.opposite()).matching(&keys)?;
        let mut matches = Vec::with_capacity(candidates.len());
        for partner in candidates {
            let combined = self.combine(side, &mine, partner, cx.tuples)?;
            match (existing.remove(&partner), combined) {
                (Some(child), Some(facts)) => {
                    out.refresh(cx.tuples, child, facts)?;
                    matches.push((partner, child));
                }
                (Some(child), None) => {
                    out.retract(cx.tuples, child)?;
                    self.unlink(side, partner, tuple, cx.tuples)?;
                }
                (None, Some(facts)) => {
                    let child = out.insert(cx.tuples, facts);
                    self.link(side, partner, tuple, child, cx.tuples)?;
                    matches.push((partner, child));
                }
                (None, None) => {}
            }
        }
        for (partner, child) in existing {
            out.retract(cx.tuples, child)?;
            self.unlink(side, partner, tuple, cx.tuples)?;
        }
        cx.tuples.set_slot(tuple, slot, Slot::Join { keys, matches })
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let (keys, matches) = match cx.tuples.take_slot(tuple, self.slot(side))? {
            Slot::Join { keys, matches } => (keys, matches),
            other => return Err(not_inserted(tuple, &other)),
        };
        self.index_mut(side).remove(&keys, tuple)?;
        for (partner, child) in matches {
            out.retract(cx.tuples, child)?;
            self.unlink(side, partner, tuple, cx.tuples)?;
        }
        Ok(())
    }
}
