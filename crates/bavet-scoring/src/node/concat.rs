use bavet_core::{Fact, Result, Score};

use super::{copy_facts, install, not_inserted, OutputQueue, Propagation, Side};
use crate::tuple::{Slot, TupleId};

/// Union of two streams of the same arity; each side passes through as is.
pub(crate) struct ConcatNode {
    left_slot: usize,
    right_slot: usize,
}

impl ConcatNode {
    pub(crate) fn new(left_slot: usize, right_slot: usize) -> Self {
        Self {
            left_slot,
            right_slot,
        }
    }

    fn slot(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_slot,
            Side::Right => self.right_slot,
        }
    }

    pub(crate) fn insert<F: Fact, Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let facts = copy_facts(cx.tuples, tuple)?;
        let child = out.insert(cx.tuples, facts);
        install(cx.tuples, tuple, self.slot(side), Slot::Out(Some(child)))
    }

    pub(crate) fn update<F: Fact, Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let child = match cx.tuples.slot_mut(tuple, self.slot(side))? {
            Slot::Out(Some(child)) => *child,
            other => return Err(not_inserted(tuple, other)),
        };
        let facts = copy_facts(cx.tuples, tuple)?;
        out.refresh(cx.tuples, child, facts)
    }

    pub(crate) fn retract<F: Fact, Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot(side))? {
            Slot::Out(Some(child)) => out.retract(cx.tuples, child),
            other => Err(not_inserted(tuple, &other)),
        }
    }
}
