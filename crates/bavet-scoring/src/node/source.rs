//! Entry points of inserted facts.

use std::collections::HashMap;

use bavet_core::{BavetError, Fact, Result};
use smallvec::smallvec;

use super::OutputQueue;
use crate::session::FactHandle;
use crate::tuple::{TupleArena, TupleId};

/// Emits one uni-tuple per inserted fact of its class.
///
/// The plain variant skips facts that are not assigned; when an update
/// changes a fact's assignment the node turns it into an insert or retract.
pub(crate) struct SourceNode<F: Fact> {
    class: F::Class,
    include_unassigned: bool,
    tuples: HashMap<FactHandle, TupleId>,
}

impl<F: Fact> SourceNode<F> {
    pub(crate) fn new(class: F::Class, include_unassigned: bool) -> Self {
        Self {
            class,
            include_unassigned,
            tuples: HashMap::new(),
        }
    }

    pub(crate) fn class(&self) -> F::Class {
        self.class
    }

    /// Number of facts this node currently emits a tuple for.
    pub(crate) fn len(&self) -> usize {
        self.tuples.len()
    }

    fn accepts(&self, fact: &F) -> bool {
        self.include_unassigned || fact.is_assigned()
    }

    pub(crate) fn insert(
        &mut self,
        handle: FactHandle,
        fact: &F,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        if !self.accepts(fact) {
            return Ok(());
        }
        if self.tuples.contains_key(&handle) {
            return Err(BavetError::illegal_state(format!(
                "{:?} was inserted twice",
                handle
            )));
        }
        let id = out.insert(tuples, smallvec![fact.clone()]);
        self.tuples.insert(handle, id);
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        handle: FactHandle,
        fact: &F,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match (self.tuples.get(&handle).copied(), self.accepts(fact)) {
            (Some(id), true) => out.refresh(tuples, id, smallvec![fact.clone()]),
            (Some(id), false) => {
                self.tuples.remove(&handle);
                out.retract(tuples, id)
            }
            (None, true) => {
                let id = out.insert(tuples, smallvec![fact.clone()]);
                self.tuples.insert(handle, id);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    pub(crate) fn retract(
        &mut self,
        handle: FactHandle,
        out: &mut OutputQueue,
        tuples: &mut TupleArena<F>,
    ) -> Result<()> {
        match self.tuples.remove(&handle) {
            Some(id) => out.retract(tuples, id),
            None => Ok(()),
        }
    }
}
