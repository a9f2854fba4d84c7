//! Per-node scratch state stored inside tuples.

use smallvec::SmallVec;

use crate::collector::Undo;
use crate::index::IndexKeys;
use crate::inliner::ScoreImpact;

use super::TupleId;

/// Scratch state a consuming node keeps in one of its parent's tuples.
///
/// A slot is written by the child's insert and consumed by its retract;
/// in between it is the only record of what the child derived from the tuple.
pub(crate) enum Slot<F> {
    /// The owning child has not inserted this tuple.
    Empty,
    /// Pass-through output (filter, map, concat); `None` when rejected.
    Out(Option<TupleId>),
    /// Outputs of a flattening node, in flattened order.
    Outs(SmallVec<[TupleId; 4]>),
    /// One side of a join: the index keys and every `(partner, output)` pair.
    Join {
        keys: IndexKeys<F>,
        matches: Vec<(TupleId, TupleId)>,
    },
    /// Left input of an exists node: matching rights and the optional output.
    ExistsLeft {
        keys: IndexKeys<F>,
        rights: Vec<TupleId>,
        out: Option<TupleId>,
    },
    /// Right input of an exists node: the lefts it is counted for.
    ExistsRight {
        keys: IndexKeys<F>,
        lefts: Vec<TupleId>,
    },
    /// Group membership with one undo token per collector.
    Group {
        key: IndexKeys<F>,
        undos: SmallVec<[Undo<F>; 2]>,
    },
    /// Distinct bucket this tuple was counted in.
    Distinct(IndexKeys<F>),
    /// Impact registered by a score node.
    Score(ScoreImpact),
}

impl<F> Slot<F> {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Slot::Empty => "empty",
            Slot::Out(_) => "out",
            Slot::Outs(_) => "outs",
            Slot::Join { .. } => "join",
            Slot::ExistsLeft { .. } => "exists-left",
            Slot::ExistsRight { .. } => "exists-right",
            Slot::Group { .. } => "group",
            Slot::Distinct(_) => "distinct",
            Slot::Score(_) => "score",
        }
    }
}
