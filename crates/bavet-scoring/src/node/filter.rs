use bavet_core::{Fact, Result, Score};

use super::{copy_facts, guard, install, not_inserted, OutputQueue, Propagation};
use crate::stream::Predicate;
use crate::tuple::{Slot, TupleId};

/// Passes through the tuples its predicate accepts.
pub(crate) struct FilterNode<F: Fact> {
    origin: String,
    slot: usize,
    predicate: Predicate<F>,
}

impl<F: Fact> FilterNode<F> {
    pub(crate) fn new(origin: String, slot: usize, predicate: Predicate<F>) -> Self {
        Self {
            origin,
            slot,
            predicate,
        }
    }

    fn accepts<Sc: Score>(&self, tuple: TupleId, cx: &Propagation<'_, F, Sc>) -> Result<bool> {
        let facts = cx.tuples.facts(tuple)?;
        guard(&self.origin, facts, || (self.predicate)(facts))
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let emitted = if self.accepts(tuple, cx)? {
            let facts = copy_facts(cx.tuples, tuple)?;
            Some(out.insert(cx.tuples, facts))
        } else {
            None
        };
        install(cx.tuples, tuple, self.slot, Slot::Out(emitted))
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let previous = match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Out(previous) => previous,
            other => return Err(not_inserted(tuple, &other)),
        };
        let emitted = match (previous, self.accepts(tuple, cx)?) {
            (Some(child), true) => {
                let facts = copy_facts(cx.tuples, tuple)?;
                out.refresh(cx.tuples, child, facts)?;
                Some(child)
            }
            (Some(child), false) => {
                out.retract(cx.tuples, child)?;
                None
            }
            (None, true) => {
                let facts = copy_facts(cx.tuples, tuple)?;
                Some(out.insert(cx.tuples, facts))
            }
            (None, false) => None,
        };
        cx.tuples.set_slot(tuple, self.slot, Slot::Out(emitted))
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Out(Some(child)) => out.retract(cx.tuples, child),
            Slot::Out(None) => Ok(()),
            other => Err(not_inserted(tuple, &other)),
        }
    }
}
