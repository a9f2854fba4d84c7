//! Constraint stream descriptors.
//!
//! A [`ConstraintFactory`] records stream definitions as plain descriptors;
//! nothing is evaluated here. The session factory later walks the descriptors
//! that scoring constraints reference, shares identical ones, and turns them
//! into network nodes.
//!
//! Streams carry tuples of 1 to 4 facts. Every user function receives the
//! tuple's facts as a slice in stream order.

mod constraint;
mod factory;
pub mod joiner;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use bavet_core::Fact;
use smallvec::SmallVec;

use crate::collector::SharedCollector;

pub use constraint::ConstraintDef;
pub use factory::ConstraintFactory;
pub use joiner::Joiner;

/// Maps one tuple to a value.
pub type TupleMapper<F, T> = Arc<dyn Fn(&[F]) -> T + Send + Sync>;

/// Extracts a key (join key, group key, mapped fact) from a tuple.
pub type KeyFn<F> = TupleMapper<F, F>;

/// Accepts or rejects a tuple.
pub type Predicate<F> = TupleMapper<F, bool>;

/// Accepts or rejects a pair of tuples.
pub type PairPredicate<F> = Arc<dyn Fn(&[F], &[F]) -> bool + Send + Sync>;

/// Expands the last fact of a tuple into any number of facts.
pub type Flattener<F> = Arc<dyn Fn(&F) -> Vec<F> + Send + Sync>;

/// Wraps a closure into a [`KeyFn`].
///
/// ```
/// use bavet_scoring::stream::key;
/// use bavet_test::Value;
///
/// let double = key(|t: &[Value]| Value::Int(t[0].as_int().unwrap_or(0) * 2));
/// assert_eq!(double(&[Value::Int(4)]), Value::Int(8));
/// ```
pub fn key<F, K>(f: K) -> KeyFn<F>
where
    K: Fn(&[F]) -> F + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handle of a stream defined in a [`ConstraintFactory`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) usize);

impl StreamId {
    /// Position of the stream in its factory.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream#{}", self.0)
    }
}

/// One stream definition.
#[derive(Clone)]
pub(crate) enum StreamKind<F: Fact> {
    ForEach {
        class: F::Class,
        include_unassigned: bool,
    },
    Filter {
        parent: StreamId,
        predicate: Predicate<F>,
    },
    Join {
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
    },
    Exists {
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
        should_exist: bool,
    },
    GroupBy {
        parent: StreamId,
        keys: Vec<KeyFn<F>>,
        collectors: Vec<SharedCollector<F>>,
    },
    Map {
        parent: StreamId,
        mappers: Vec<KeyFn<F>>,
    },
    FlattenLast {
        parent: StreamId,
        flattener: Flattener<F>,
    },
    Concat {
        left: StreamId,
        right: StreamId,
    },
    Distinct {
        parent: StreamId,
    },
}

impl<F: Fact> StreamKind<F> {
    /// Parent streams, left side first.
    pub(crate) fn parents(&self) -> SmallVec<[StreamId; 2]> {
        let mut parents = SmallVec::new();
        match self {
            StreamKind::ForEach { .. } => {}
            StreamKind::Filter { parent, .. }
            | StreamKind::GroupBy { parent, .. }
            | StreamKind::Map { parent, .. }
            | StreamKind::FlattenLast { parent, .. }
            | StreamKind::Distinct { parent } => parents.push(*parent),
            StreamKind::Join { left, right, .. }
            | StreamKind::Exists { left, right, .. }
            | StreamKind::Concat { left, right } => {
                parents.push(*left);
                parents.push(*right);
            }
        }
        parents
    }

    /// Short name of the stream operation.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            StreamKind::ForEach {
                include_unassigned: false,
                ..
            } => "for_each",
            StreamKind::ForEach {
                include_unassigned: true,
                ..
            } => "for_each_including_unassigned",
            StreamKind::Filter { .. } => "filter",
            StreamKind::Join { .. } => "join",
            StreamKind::Exists {
                should_exist: true,
                ..
            } => "if_exists",
            StreamKind::Exists {
                should_exist: false,
                ..
            } => "if_not_exists",
            StreamKind::GroupBy { .. } => "group_by",
            StreamKind::Map { .. } => "map",
            StreamKind::FlattenLast { .. } => "flatten_last",
            StreamKind::Concat { .. } => "concat",
            StreamKind::Distinct { .. } => "distinct",
        }
    }
}

/// A stream definition with its output arity.
pub(crate) struct StreamDef<F: Fact> {
    pub(crate) kind: StreamKind<F>,
    pub(crate) arity: usize,
}
