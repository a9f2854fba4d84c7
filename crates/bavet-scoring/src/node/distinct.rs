use std::collections::HashMap;

use bavet_core::{BavetError, Fact, Result, Score};

use super::{copy_facts, install, not_inserted, OutputQueue, Propagation};
use crate::index::IndexKeys;
use crate::tuple::{Slot, TupleId};

struct Bucket {
    count: usize,
    out: TupleId,
}

/// Emits one tuple per distinct combination of facts, reference counted.
pub(crate) struct DistinctNode<F: Fact> {
    slot: usize,
    buckets: HashMap<IndexKeys<F>, Bucket>,
}

impl<F: Fact> DistinctNode<F> {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            buckets: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    fn acquire<Sc: Score>(
        &mut self,
        key: &IndexKeys<F>,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.count += 1;
            return;
        }
        let child = out.insert(cx.tuples, key.as_slice().iter().cloned().collect());
        self.buckets.insert(key.clone(), Bucket { count: 1, out: child });
    }

    fn release<Sc: Score>(
        &mut self,
        key: &IndexKeys<F>,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let bucket = self.buckets.get_mut(key).ok_or_else(|| {
            BavetError::illegal_state(format!("distinct bucket {:?} does not exist", key))
        })?;
        bucket.count -= 1;
        if bucket.count == 0 {
            let child = bucket.out;
            self.buckets.remove(key);
            out.retract(cx.tuples, child)?;
        }
        Ok(())
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let key: IndexKeys<F> = copy_facts(cx.tuples, tuple)?.into_iter().collect();
        install(cx.tuples, tuple, self.slot, Slot::Distinct(key.clone()))?;
        self.acquire(&key, out, cx);
        Ok(())
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let previous = match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Distinct(previous) => previous,
            other => return Err(not_inserted(tuple, &other)),
        };
        let key: IndexKeys<F> = copy_facts(cx.tuples, tuple)?.into_iter().collect();
        if key != previous {
            self.release(&previous, out, cx)?;
            self.acquire(&key, out, cx);
        }
        cx.tuples.set_slot(tuple, self.slot, Slot::Distinct(key))
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Distinct(key) => self.release(&key, out, cx),
            other => Err(not_inserted(tuple, &other)),
        }
    }
}
