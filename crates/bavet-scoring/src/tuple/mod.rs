//! Tuple store.
//!
//! A tuple is one matched combination of 1 to 4 facts. Tuples live in a
//! per-session [`TupleArena`] and are addressed by generational [`TupleId`]s,
//! so nodes refer to each other's tuples by index and never by reference.
//!
//! Every tuple carries a scratch store with one [`Slot`] per consuming node
//! input. The producing node sizes the store to its number of children; the
//! child owning slot `i` is the only reader and writer of it.

mod arena;
mod slot;


use std::fmt;

use smallvec::SmallVec;

pub use arena::TupleArena;
pub(crate) use slot::Slot;

/// Maximum number of facts in one tuple.
pub const MAX_ARITY: usize = 4;

/// Facts of one tuple, inline up to [`MAX_ARITY`].
pub type Facts<F> = SmallVec<[F; MAX_ARITY]>;

/// Stable address of a tuple in a [`TupleArena`].
///
/// The generation makes a stale id (one whose tuple was freed and whose
/// index was reused) fail lookup instead of aliasing the new tuple.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId {
    index: u32,
    generation: u32,
}

impl TupleId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the arena entry this id was issued for.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tuple#{}v{}", self.index, self.generation)
    }
}

/// Lifecycle state of a tuple, as staged by its producing node.
///
/// Staging transitions:
///
/// | event   | from                        | to         |
/// |---------|-----------------------------|------------|
/// | insert  | -                           | `Creating` |
/// | update  | `Ok`                        | `Updating` |
/// | update  | `Creating`, `Updating`      | unchanged  |
/// | retract | `Ok`, `Updating`            | `Dying`    |
/// | retract | `Creating`                  | `Aborting` |
/// | retract | `Dying`, `Aborting`, `Dead` | error      |
///
/// Propagation moves `Creating` and `Updating` to `Ok`, and `Dying` and
/// `Aborting` to `Dead`, after which the tuple is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleState {
    /// Staged for insertion; children have not seen it.
    Creating,
    /// Settled and visible to children.
    Ok,
    /// Staged for an update; children saw an earlier version.
    Updating,
    /// Staged for retraction; children saw it.
    Dying,
    /// Retracted before children ever saw it.
    Aborting,
    /// Fully retracted.
    Dead,
}

impl TupleState {
    /// Returns true if the tuple is staged in its producer's queue.
    pub fn is_dirty(self) -> bool {
        !matches!(self, TupleState::Ok | TupleState::Dead)
    }

    /// Returns true if the tuple was retracted, whether or not it propagated.
    pub fn is_retracted(self) -> bool {
        matches!(
            self,
            TupleState::Dying | TupleState::Aborting | TupleState::Dead
        )
    }
}

/// One matched combination of facts plus its per-child scratch store.
pub struct Tuple<F> {
    pub(crate) facts: Facts<F>,
    pub(crate) state: TupleState,
    pub(crate) store: Vec<Slot<F>>,
}

impl<F> Tuple<F> {
    /// The facts of this tuple, in stream order.
    #[inline]
    pub fn facts(&self) -> &[F] {
        &self.facts
    }

    /// Number of facts.
    #[inline]
    pub fn arity(&self) -> usize {
        self.facts.len()
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> TupleState {
        self.state
    }
}

impl<F: fmt::Debug> fmt::Debug for Tuple<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuple")
            .field("facts", &self.facts)
            .field("state", &self.state)
            .finish()
    }
}
