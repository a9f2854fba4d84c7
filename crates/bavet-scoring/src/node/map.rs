use bavet_core::{Fact, Result, Score};
use smallvec::SmallVec;

use super::{guard, install, not_inserted, OutputQueue, Propagation};
use crate::stream::{Flattener, KeyFn};
use crate::tuple::{Facts, Slot, TupleId};

/// Replaces each tuple by the results of its mapping functions.
pub(crate) struct MapNode<F: Fact> {
    origin: String,
    slot: usize,
    mappers: Vec<KeyFn<F>>,
}

impl<F: Fact> MapNode<F> {
    pub(crate) fn new(origin: String, slot: usize, mappers: Vec<KeyFn<F>>) -> Self {
        Self {
            origin,
            slot,
            mappers,
        }
    }

    fn map<Sc: Score>(&self, tuple: TupleId, cx: &Propagation<'_, F, Sc>) -> Result<Facts<F>> {
        let facts = cx.tuples.facts(tuple)?;
        guard(&self.origin, facts, || {
            self.mappers.iter().map(|mapper| mapper(facts)).collect()
        })
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let mapped = self.map(tuple, cx)?;
        let child = out.insert(cx.tuples, mapped);
        install(cx.tuples, tuple, self.slot, Slot::Out(Some(child)))
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let child = match cx.tuples.slot_mut(tuple, self.slot)? {
            Slot::Out(Some(child)) => *child,
            other => return Err(not_inserted(tuple, other)),
        };
        let mapped = self.map(tuple, cx)?;
        out.refresh(cx.tuples, child, mapped)
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Out(Some(child)) => out.retract(cx.tuples, child),
            other => Err(not_inserted(tuple, &other)),
        }
    }
}

/// Expands the last fact of each tuple into one tuple per produced item.
///
/// Outputs keep the leading facts and replace the last one by the item.
/// On update they are matched to the new items by position.
pub(crate) struct FlattenLastNode<F: Fact> {
    origin: String,
    slot: usize,
    flattener: Flattener<F>,
}

impl<F: Fact> FlattenLastNode<F> {
    pub(crate) fn new(origin: String, slot: usize, flattener: Flattener<F>) -> Self {
        Self {
            origin,
            slot,
            flattener,
        }
    }

    fn flatten<Sc: Score>(
        &self,
        tuple: TupleId,
        cx: &Propagation<'_, F, Sc>,
    ) -> Result<Vec<Facts<F>>> {
        let facts = cx.tuples.facts(tuple)?;
        let Some((last, head)) = facts.split_last() else {
            return Ok(Vec::new());
        };
        let items = guard(&self.origin, facts, || (self.flattener)(last))?;
        Ok(items
            .into_iter()
            .map(|item| head.iter().cloned().chain(std::iter::once(item)).collect())
            .collect())
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let children = self
            .flatten(tuple, cx)?
            .into_iter()
            .map(|facts| out.insert(cx.tuples, facts))
            .collect();
        install(cx.tuples, tuple, self.slot, Slot::Outs(children))
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let previous = match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Outs(previous) => previous,
            other => return Err(not_inserted(tuple, &other)),
        };
        let flattened = self.flatten(tuple, cx)?;

        let mut children: SmallVec<[TupleId; 4]> = SmallVec::with_capacity(flattened.len());
        let mut previous = previous.into_iter();
        for facts in flattened {
            match previous.next() {
                Some(child) => {
                    out.refresh(cx.tuples, child, facts)?;
                    children.push(child);
                }
                None => children.push(out.insert(cx.tuples, facts)),
            }
        }
        for stale in previous {
            out.retract(cx.tuples, stale)?;
        }
        cx.tuples.set_slot(tuple, self.slot, Slot::Outs(children))
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Outs(children) => {
                for child in children {
                    out.retract(cx.tuples, child)?;
                }
                Ok(())
            }
            other => Err(not_inserted(tuple, &other)),
        }
    }
}
