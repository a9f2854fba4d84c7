//! Network nodes.
//!
//! Nodes form a DAG built once per session from the compiled plan. Each node
//! consumes tuples from one or two parents through `insert`, `update` and
//! `retract`, and stages its own output tuples in an [`OutputQueue`]. The
//! session drains those queues layer by layer.
//!
//! Per-tuple node state lives in the parent tuple's slot, never in the node.
//! Nodes themselves only keep what must be shared across tuples: indexes,
//! groups, distinct buckets and source handles.

mod concat;
mod distinct;
mod exists;
mod filter;
mod group;
mod join;
mod map;
mod queue;
mod score;
mod source;


use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

use bavet_core::{BavetError, Fact, Result, Score};
use smallvec::SmallVec;

use crate::inliner::ScoreInliner;
use crate::tuple::{Facts, Slot, TupleArena, TupleId};

pub(crate) use concat::ConcatNode;
pub(crate) use distinct::DistinctNode;
pub(crate) use exists::ExistsNode;
pub(crate) use filter::FilterNode;
pub(crate) use group::GroupNode;
pub(crate) use join::JoinNode;
pub(crate) use map::{FlattenLastNode, MapNode};
pub(crate) use queue::OutputQueue;
pub(crate) use score::ScoreNode;
pub(crate) use source::SourceNode;

/// Position of a node in the session's node arena.
pub(crate) type NodeId = usize;

/// Which input of a node a tuple arrives on. Uni-input nodes use `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Parent to child wiring. The edge's position in the parent's child list is
/// the slot index the child owns in the parent's tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) child: NodeId,
    pub(crate) side: Side,
}

/// Mutable session state a node touches while handling one event.
pub(crate) struct Propagation<'a, F, Sc: Score> {
    pub(crate) tuples: &'a mut TupleArena<F>,
    pub(crate) inliner: &'a mut ScoreInliner<F, Sc>,
}

/// A node with its wiring and output staging.
pub(crate) struct NodeEntry<F: Fact> {
    pub(crate) node: Node<F>,
    pub(crate) layer: usize,
    pub(crate) children: SmallVec<[Edge; 2]>,
    pub(crate) out: OutputQueue,
}

/// Every node kind of the network.
pub(crate) enum Node<F: Fact> {
    Source(SourceNode<F>),
    Filter(FilterNode<F>),
    Join(JoinNode<F>),
    Exists(ExistsNode<F>),
    Group(GroupNode<F>),
    Map(MapNode<F>),
    FlattenLast(FlattenLastNode<F>),
    Concat(ConcatNode),
    Distinct(DistinctNode<F>),
    Score(ScoreNode<F>),
}

impl<F: Fact> Node<F> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Source(_) => "source",
            Node::Filter(_) => "filter",
            Node::Join(_) => "join",
            Node::Exists(n) if n.should_exist() => "if_exists",
            Node::Exists(_) => "if_not_exists",
            Node::Group(_) => "group_by",
            Node::Map(_) => "map",
            Node::FlattenLast(_) => "flatten_last",
            Node::Concat(_) => "concat",
            Node::Distinct(_) => "distinct",
            Node::Score(_) => "score",
        }
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match self {
            Node::Source(_) => Err(source_input()),
            Node::Filter(n) => n.insert(tuple, out, cx),
            Node::Join(n) => n.insert(side, tuple, out, cx),
            Node::Exists(n) => n.insert(side, tuple, out, cx),
            Node::Group(n) => n.insert(tuple, cx),
            Node::Map(n) => n.insert(tuple, out, cx),
            Node::FlattenLast(n) => n.insert(tuple, out, cx),
            Node::Concat(n) => n.insert(side, tuple, out, cx),
            Node::Distinct(n) => n.insert(tuple, out, cx),
            Node::Score(n) => n.insert(tuple, cx),
        }
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match self {
            Node::Source(_) => Err(source_input()),
            Node::Filter(n) => n.update(tuple, out, cx),
            Node::Join(n) => n.update(side, tuple, out, cx),
            Node::Exists(n) => n.update(side, tuple, out, cx),
            Node::Group(n) => n.update(tuple, cx),
            Node::Map(n) => n.update(tuple, out, cx),
            Node::FlattenLast(n) => n.update(tuple, out, cx),
            Node::Concat(n) => n.update(side, tuple, out, cx),
            Node::Distinct(n) => n.update(tuple, out, cx),
            Node::Score(n) => n.update(tuple, cx),
        }
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        side: Side,
        tuple: TupleId,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match self {
            Node::Source(_) => Err(source_input()),
            Node::Filter(n) => n.retract(tuple, out, cx),
            Node::Join(n) => n.retract(side, tuple, out, cx),
            Node::Exists(n) => n.retract(side, tuple, out, cx),
            Node::Group(n) => n.retract(tuple, cx),
            Node::Map(n) => n.retract(tuple, out, cx),
            Node::FlattenLast(n) => n.retract(tuple, out, cx),
            Node::Concat(n) => n.retract(side, tuple, out, cx),
            Node::Distinct(n) => n.retract(tuple, out, cx),
            Node::Score(n) => n.retract(tuple, cx),
        }
    }

    /// Publishes deferred outputs before the node's layer propagates.
    pub(crate) fn flush<Sc: Score>(
        &mut self,
        out: &mut OutputQueue,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match self {
            Node::Group(n) => n.flush(out, cx),
            _ => Ok(()),
        }
    }

    /// Entries held in the node's left and right indexes.
    pub(crate) fn indexed(&self) -> (usize, usize) {
        match self {
            Node::Join(n) => n.indexed(),
            Node::Exists(n) => n.indexed(),
            _ => (0, 0),
        }
    }

    /// Groups, distinct buckets or tracked facts, depending on the kind.
    pub(crate) fn buckets(&self) -> usize {
        match self {
            Node::Source(n) => n.len(),
            Node::Group(n) => n.len(),
            Node::Distinct(n) => n.len(),
            _ => 0,
        }
    }
}

fn source_input() -> BavetError {
    BavetError::illegal_state("source nodes have no parent input")
}

/// Runs a user function, turning a panic into [`BavetError::UserFunction`].
pub(crate) fn guard<D, T>(origin: &str, facts: &D, f: impl FnOnce() -> T) -> Result<T>
where
    D: Debug + ?Sized,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| BavetError::UserFunction {
        constraint: origin.to_string(),
        facts: format!("{:?}", facts),
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Copies the facts of a live tuple.
pub(crate) fn copy_facts<F: Clone>(tuples: &TupleArena<F>, id: TupleId) -> Result<Facts<F>> {
    Ok(tuples.facts(id)?.iter().cloned().collect())
}

/// Installs a slot on insert; a non-empty slot means a double insert.
pub(crate) fn install<F>(
    tuples: &mut TupleArena<F>,
    id: TupleId,
    slot: usize,
    value: Slot<F>,
) -> Result<()> {
    let entry = tuples.slot_mut(id, slot)?;
    if !entry.is_empty() {
        return Err(BavetError::illegal_state(format!(
            "{:?} was inserted twice into the same node input",
            id
        )));
    }
    *entry = value;
    Ok(())
}

pub(crate) fn not_inserted<F>(id: TupleId, found: &Slot<F>) -> BavetError {
    BavetError::illegal_state(format!(
        "{:?} was never inserted into this node input (slot holds {})",
        id,
        found.kind()
    ))
}
