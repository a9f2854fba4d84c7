//! Staging queue of a node's output tuples.

use bavet_core::{BavetError, Result};

use crate::tuple::{Facts, TupleArena, TupleId, TupleState};

/// Output tuples of one node waiting for its layer to propagate.
///
/// Each tuple is queued at most once per settle, whatever mix of insert,
/// update and retract it went through: the tuple's [`TupleState`] records
/// the net effect.
#[derive(Debug, Default)]
pub(crate) struct OutputQueue {
    staged: Vec<TupleId>,
    // Slots per output tuple, one per child input.
    store_size: usize,
}

impl OutputQueue {
    pub(crate) fn new(store_size: usize) -> Self {
        Self {
            staged: Vec::new(),
            store_size,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.staged.len()
    }

    /// Allocates a new output tuple in the `Creating` state.
    pub(crate) fn insert<F>(&mut self, tuples: &mut TupleArena<F>, facts: Facts<F>) -> TupleId {
        let id = tuples.alloc(facts, self.store_size);
        self.staged.push(id);
        id
    }

    /// Stages an update of a tuple whose facts were changed in place.
    pub(crate) fn update<F>(&mut self, tuples: &mut TupleArena<F>, id: TupleId) -> Result<()> {
        let tuple = tuples.get_mut(id)?;
        match tuple.state {
            TupleState::Ok => {
                tuple.state = TupleState::Updating;
                self.staged.push(id);
                Ok(())
            }
            TupleState::Creating | TupleState::Updating => Ok(()),
            state => Err(BavetError::illegal_state(format!(
                "cannot update {:?} in state {:?}",
                id, state
            ))),
        }
    }

    /// Stages a retraction.
    pub(crate) fn retract<F>(&mut self, tuples: &mut TupleArena<F>, id: TupleId) -> Result<()> {
        let tuple = tuples.get_mut(id)?;
        match tuple.state {
            TupleState::Ok => {
                tuple.state = TupleState::Dying;
                self.staged.push(id);
                Ok(())
            }
            TupleState::Updating => {
                tuple.state = TupleState::Dying;
                Ok(())
            }
            TupleState::Creating => {
                tuple.state = TupleState::Aborting;
                Ok(())
            }
            state => Err(BavetError::illegal_state(format!(
                "cannot retract {:?} in state {:?}",
                id, state
            ))),
        }
    }

    /// Replaces the facts of an output tuple, staging an update if they changed.
    pub(crate) fn refresh<F: PartialEq>(
        &mut self,
        tuples: &mut TupleArena<F>,
        id: TupleId,
        facts: Facts<F>,
    ) -> Result<()> {
        let tuple = tuples.get_mut(id)?;
        if tuple.facts == facts {
            return Ok(());
        }
        tuple.facts = facts;
        self.update(tuples, id)
    }

    /// Hands the staged tuples to the propagation sweep.
    pub(crate) fn take(&mut self) -> Vec<TupleId> {
        std::mem::take(&mut self.staged)
    }
}
