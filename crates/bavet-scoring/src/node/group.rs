use std::collections::HashMap;

use bavet_core::{BavetError, Fact, Result, Score};
use smallvec::SmallVec;

use super::{guard, install, not_inserted, OutputQueue, Propagation};
use crate::collector::{Accumulator, SharedCollector, Undo};
use crate::index::IndexKeys;
use crate::stream::KeyFn;
use crate::tuple::{Facts, Slot, TupleId};

struct Group<F> {
    accumulators: Vec<Box<dyn Accumulator<F>>>,
    members: usize,
    out: Option<TupleId>,
    dirty: bool,
}

/// Partitions tuples by key and aggregates each partition.
///
/// Inserts and retracts only touch accumulators and mark the group dirty.
/// Output tuples (`key facts ++ collector results`) are published by
/// [`flush`](GroupNode::flush) when the node's layer is about to propagate,
/// so a group that changes many times within one settle emits one update.
pub(crate) struct GroupNode<F: Fact> {
    origin: String,
    slot: usize,
    keys: Vec<KeyFn<F>>,
    collectors: Vec<SharedCollector<F>>,
    groups: HashMap<IndexKeys<F>, Group<F>>,
    dirty: Vec<IndexKeys<F>>,
}

impl<F: Fact> GroupNode<F> {
    pub(crate) fn new(
        origin: String,
        slot: usize,
        keys: Vec<KeyFn<F>>,
        collectors: Vec<SharedCollector<F>>,
    ) -> Self {
        Self {
            origin,
            slot,
            keys,
            collectors,
            groups: HashMap::new(),
            dirty: Vec::new(),
        }
    }

    /// Number of live groups.
    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    fn key(&self, facts: &[F]) -> Result<IndexKeys<F>> {
        if self.keys.is_empty() {
            return Ok(IndexKeys::empty());
        }
        guard(&self.origin, facts, || {
            self.keys.iter().map(|key| key(facts)).collect()
        })
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let facts = cx.tuples.facts(tuple)?;
        let key = self.key(facts)?;
        let collectors = &self.collectors;
        let group = self.groups.entry(key.clone()).or_insert_with(|| Group {
            accumulators: collectors.iter().map(|c| c.supply()).collect(),
            members: 0,
            out: None,
            dirty: false,
        });
        let undos: SmallVec<[Undo<F>; 2]> = guard(&self.origin, facts, || {
            group
                .accumulators
                .iter_mut()
                .map(|acc| acc.accumulate(facts))
                .collect()
        })?;
        group.members += 1;
        if !group.dirty {
            group.dirty = true;
            self.dirty.push(key.clone());
        }
        install(cx.tuples, tuple, self.slot, Slot::Group { key, undos })
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        self.retract(tuple, cx)?;
        self.insert(tuple, cx)
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let (key, undos) = match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Group { key, undos } => (key, undos),
            other => return Err(not_inserted(tuple, &other)),
        };
        let facts = cx.tuples.facts(tuple)?;
        let group = self.groups.get_mut(&key).ok_or_else(|| {
            BavetError::illegal_state(format!("group {:?} does not exist", key))
        })?;
        guard(&self.origin, facts, || {
            for (acc, undo) in group.accumulators.iter_mut().zip(undos) {
                acc.undo(undo);
            }
        })?;
        group.members -= 1;
        if !group.dirty {
            group.dirty = true;
            self.dirty.push(key);
        }
        Ok(())
    }

    /// Publishes the output tuples of every group touched since the last flush.
    ///
    /// A group whose collectors have no defined result (a min over nothing)
    /// has no output tuple until they do.
    pub(crate) fn flush<Sc: Score>(
        &mut self,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        for key in std::mem::take(&mut self.dirty) {
            let Some(group) = self.groups.get_mut(&key) else {
                continue;
            };
            group.dirty = false;
            if group.members == 0 {
                if let Some(child) = group.out {
                    out.retract(cx.tuples, child)?;
                }
                self.groups.remove(&key);
                continue;
            }

            let results: Option<Vec<F>> = guard(&self.origin, key.as_slice(), || {
                group.accumulators.iter().map(|acc| acc.result()).collect()
            })?;
            match (group.out, results) {
                (Some(child), Some(results)) => {
                    let facts: Facts<F> = key.as_slice().iter().cloned().chain(results).collect();
                    out.refresh(cx.tuples, child, facts)?;
                }
                (None, Some(results)) => {
                    let facts: Facts<F> = key.as_slice().iter().cloned().chain(results).collect();
                    group.out = Some(out.insert(cx.tuples, facts));
                }
                (Some(child), None) => {
                    out.retract(cx.tuples, child)?;
                    group.out = None;
                }
                (None, None) => {}
            }
        }
        Ok(())
    }
}
