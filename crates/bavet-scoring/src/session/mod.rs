//! Scoring sessions.
//!
//! A [`SessionFactory`] validates constraint definitions once; each
//! [`Session`] it builds owns a private instance of the network. Facts are
//! inserted, updated and retracted through [`FactHandle`]s; those calls only
//! stage work at the source nodes. [`Session::settle`] then propagates the
//! staged tuples layer by layer and returns the score.
//!
//! Within a layer, dirty groups are flushed first, then every staged retract
//! is propagated, then every update, then every insert. A node's layer is one
//! more than its deepest parent's, so by the time a layer runs, all of its
//! inputs for this settle have arrived.
//!
//! # Example
//!
//! ```
//! use bavet_config::SessionConfig;
//! use bavet_core::{ConstraintRef, SimpleScore};
//! use bavet_scoring::api::weight_overrides::ConstraintWeightOverrides;
//! use bavet_scoring::session::SessionFactory;
//! use bavet_scoring::stream::{joiner, ConstraintDef, ConstraintFactory};
//! use bavet_test::{nqueens, Class, Value};
//!
//! let mut factory = ConstraintFactory::new();
//! let queens = factory.for_each(Class::Queen);
//! let same_row = factory
//!     .join(
//!         queens,
//!         queens,
//!         vec![
//!             joiner::equal(|t: &[Value]| Value::from(nqueens::queen_parts(&t[0]).2.unwrap_or(-1))),
//!             joiner::less_than(
//!                 |t: &[Value]| nqueens::queen_parts(&t[0]).0,
//!                 |t: &[Value]| nqueens::queen_parts(&t[0]).0,
//!             ),
//!         ],
//!     )
//!     .unwrap();
//! let constraints = vec![ConstraintDef::penalize(
//!     ConstraintRef::new("nqueens", "Row conflict"),
//!     same_row,
//!     SimpleScore::of(1),
//! )];
//!
//! let sessions = SessionFactory::new(factory, constraints, SessionConfig::default()).unwrap();
//! let mut session = sessions
//!     .build_session(&ConstraintWeightOverrides::new())
//!     .unwrap();
//!
//! let a = session.insert(nqueens::queen(0, 0, 1)).unwrap();
//! session.insert(nqueens::queen(1, 1, 1)).unwrap();
//! assert_eq!(session.settle().unwrap(), SimpleScore::of(-1));
//!
//! session.update(a, nqueens::queen(0, 0, 2)).unwrap();
//! assert_eq!(session.settle().unwrap(), SimpleScore::of(0));
//! ```

mod factory;
mod plan;
mod statistics;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bavet_core::{BavetError, Fact, Result, Score};
use tracing::{error, trace};

use crate::api::analysis::{ConstraintAnalysis, ConstraintMatch, IndictmentMap, ScoreExplanation};
use crate::inliner::{ConstraintTotal, ScoreInliner};
use crate::node::{Node, NodeEntry, NodeId, OutputQueue, Propagation, SourceNode};
use crate::tuple::{TupleArena, TupleId, TupleState};

pub use factory::SessionFactory;
pub use plan::SessionPlan;
pub use statistics::{NodeStatistics, SessionStatistics};

/// Identity of an inserted fact within its session.
///
/// Facts are compared by value inside the network; the handle is what ties
/// an update or retract to the fact it replaces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactHandle(u64);

impl FactHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact#{}", self.0)
    }
}

/// One live instance of a compiled network.
///
/// A session is single-threaded. It is `Send`, so it can be moved to the
/// thread that drives it, and sessions built from one factory share nothing
/// mutable.
pub struct Session<F: Fact, Sc: Score> {
    plan: Arc<SessionPlan<F, Sc>>,
    nodes: Vec<NodeEntry<F>>,
    tuples: TupleArena<F>,
    inliner: ScoreInliner<F, Sc>,
    facts: BTreeMap<FactHandle, F>,
    next_handle: u64,
    settled: bool,
    poisoned: bool,
}

impl<F: Fact, Sc: Score> Session<F, Sc> {
    /// Instantiates an empty session from a compiled plan.
    pub fn new(plan: Arc<SessionPlan<F, Sc>>) -> Self {
        let nodes = plan.nodes.iter().map(|node| node.instantiate()).collect();
        let inliner = ScoreInliner::new(plan.policy, plan.constraints.clone());
        Self {
            plan,
            nodes,
            tuples: TupleArena::new(),
            inliner,
            facts: BTreeMap::new(),
            next_handle: 0,
            settled: true,
            poisoned: false,
        }
    }

    pub fn plan(&self) -> &Arc<SessionPlan<F, Sc>> {
        &self.plan
    }

    /// Returns true if no change is waiting for [`settle`](Self::settle).
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Returns true once a failure has left the session unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Looks up a live fact.
    pub fn fact(&self, handle: FactHandle) -> Option<&F> {
        self.facts.get(&handle)
    }

    /// Live facts in insertion order.
    pub fn facts(&self) -> impl Iterator<Item = (FactHandle, &F)> {
        self.facts.iter().map(|(handle, fact)| (*handle, fact))
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Stages the insertion of a fact at the source nodes of its class.
    pub fn insert(&mut self, fact: F) -> Result<FactHandle> {
        self.check_usable()?;
        let handle = FactHandle(self.next_handle);
        self.next_handle += 1;
        let staged = self.stage(fact.class(), |source, out, tuples| {
            source.insert(handle, &fact, out, tuples)
        });
        self.guarded(staged)?;
        self.facts.insert(handle, fact);
        self.settled = false;
        Ok(handle)
    }

    /// Stages the replacement of a live fact by a new value of the same class.
    pub fn update(&mut self, handle: FactHandle, fact: F) -> Result<()> {
        self.check_usable()?;
        let previous = self.facts.get(&handle).ok_or_else(|| unknown_fact(handle))?;
        if previous.class() != fact.class() {
            return Err(BavetError::illegal_state(format!(
                "{:?} cannot change class from {:?} to {:?}",
                handle,
                previous.class(),
                fact.class()
            )));
        }
        let staged = self.stage(fact.class(), |source, out, tuples| {
            source.update(handle, &fact, out, tuples)
        });
        self.guarded(staged)?;
        self.facts.insert(handle, fact);
        self.settled = false;
        Ok(())
    }

    /// Stages the retraction of a live fact and returns its last value.
    pub fn retract(&mut self, handle: FactHandle) -> Result<F> {
        self.check_usable()?;
        let fact = self.facts.remove(&handle).ok_or_else(|| unknown_fact(handle))?;
        let staged = self.stage(fact.class(), |source, out, tuples| {
            source.retract(handle, out, tuples)
        });
        self.guarded(staged)?;
        self.settled = false;
        Ok(fact)
    }

    fn stage(
        &mut self,
        class: F::Class,
        mut apply: impl FnMut(&mut SourceNode<F>, &mut OutputQueue, &mut TupleArena<F>) -> Result<()>,
    ) -> Result<()> {
        let Some(sources) = self.plan.sources.get(&class) else {
            return Ok(());
        };
        for &id in sources {
            let entry = &mut self.nodes[id];
            match &mut entry.node {
                Node::Source(source) if source.class() == class => {
                    apply(source, &mut entry.out, &mut self.tuples)?
                }
                other => {
                    return Err(BavetError::illegal_state(format!(
                        "node {} routed for class {:?} is a {} node",
                        id,
                        class,
                        other.kind()
                    )))
                }
            }
        }
        Ok(())
    }

    /// Propagates every staged change and returns the new score.
    ///
    /// Under `FastAssert` the session then checks that nothing is left
    /// staged; under `FullAssert` it also compares the score against a
    /// from-scratch rebuild.
    pub fn settle(&mut self) -> Result<Sc> {
        self.check_usable()?;
        let settled = self.propagate();
        self.guarded(settled)?;
        self.settled = true;

        let mode = self.plan.environment_mode;
        if mode.is_asserted() {
            let checked = self.assert_quiescent();
            self.guarded(checked)?;
        }
        if mode.is_fully_asserted() {
            let checked = self.assert_from_scratch();
            self.guarded(checked)?;
        }
        Ok(self.inliner.score())
    }

    fn propagate(&mut self) -> Result<()> {
        let plan = Arc::clone(&self.plan);
        for (layer, ids) in plan.layers.iter().enumerate() {
            let mut cx = Propagation {
                tuples: &mut self.tuples,
                inliner: &mut self.inliner,
            };
            for &id in ids {
                let entry = &mut self.nodes[id];
                entry.node.flush(&mut entry.out, &mut cx)?;
            }

            let mut staged: Vec<(NodeId, TupleId, TupleState)> = Vec::new();
            for &id in ids {
                for tuple in self.nodes[id].out.take() {
                    staged.push((id, tuple, cx.tuples.get(tuple)?.state()));
                }
            }
            if staged.is_empty() {
                continue;
            }
            trace!(event = "layer_propagated", layer, tuples = staged.len());

            for &(id, tuple, state) in &staged {
                match state {
                    TupleState::Dying => {
                        for edge in &plan.nodes[id].children {
                            let child = &mut self.nodes[edge.child];
                            child.node.retract(edge.side, tuple, &mut child.out, &mut cx)?;
                        }
                        cx.tuples.free(tuple)?;
                    }
                    TupleState::Aborting => {
                        cx.tuples.free(tuple)?;
                    }
                    _ => {}
                }
            }
            for &(id, tuple, state) in &staged {
                if state == TupleState::Updating {
                    for edge in &plan.nodes[id].children {
                        let child = &mut self.nodes[edge.child];
                        child.node.update(edge.side, tuple, &mut child.out, &mut cx)?;
                    }
                    cx.tuples.get_mut(tuple)?.state = TupleState::Ok;
                }
            }
            for &(id, tuple, state) in &staged {
                if state == TupleState::Creating {
                    for edge in &plan.nodes[id].children {
                        let child = &mut self.nodes[edge.child];
                        child.node.insert(edge.side, tuple, &mut child.out, &mut cx)?;
                    }
                    cx.tuples.get_mut(tuple)?.state = TupleState::Ok;
                }
            }
        }
        Ok(())
    }

    /// The settled score.
    pub fn score(&self) -> Result<Sc> {
        self.check_readable()?;
        Ok(self.inliner.score())
    }

    /// Per-constraint totals and match counts of the settled session.
    pub fn constraint_totals(&self) -> Result<&[ConstraintTotal<Sc>]> {
        self.check_readable()?;
        Ok(self.inliner.totals())
    }

    /// Breaks the settled score down per constraint.
    ///
    /// Individual matches are listed unless the constraint match policy is
    /// `Disabled`; their justifications only with `EnabledWithJustifications`.
    pub fn explain(&self) -> Result<ScoreExplanation<F, Sc>> {
        self.check_readable()?;
        let mut constraint_analyses: Vec<ConstraintAnalysis<F, Sc>> = self
            .inliner
            .totals()
            .iter()
            .map(|total| ConstraintAnalysis {
                constraint_ref: total.constraint_ref.clone(),
                weight: total.weight,
                score: total.score,
                match_count: total.match_count,
                matches: Vec::new(),
                is_hard: total.weight.has_hard_component(),
            })
            .collect();
        for record in self.inliner.records() {
            let analysis = &mut constraint_analyses[record.constraint];
            let (justification, indicted) = match &record.detail {
                Some(detail) => (Some(detail.justification.clone()), detail.indicted.clone()),
                None => (None, Vec::new()),
            };
            analysis.matches.push(ConstraintMatch {
                constraint_ref: analysis.constraint_ref.clone(),
                score: record.score,
                justification,
                indicted,
            });
        }
        Ok(ScoreExplanation {
            score: self.inliner.score(),
            constraint_analyses,
        })
    }

    /// Attributes the settled score to the facts each match indicts.
    ///
    /// Empty unless the constraint match policy is `EnabledWithJustifications`.
    pub fn indict(&self) -> Result<IndictmentMap<F, Sc>> {
        let explanation = self.explain()?;
        Ok(IndictmentMap::from_matches(
            explanation
                .constraint_analyses
                .into_iter()
                .flat_map(|analysis| analysis.matches),
        ))
    }

    /// Recomputes the score in a fresh session holding the same facts and
    /// fails with [`BavetError::ScoreCorruption`] if it differs.
    pub fn assert_from_scratch(&self) -> Result<()> {
        self.check_readable()?;
        let mut fresh = Session::new(Arc::clone(&self.plan));
        for fact in self.facts.values() {
            fresh.insert(fact.clone())?;
        }
        fresh.propagate()?;
        let expected = fresh.inliner.score();
        let actual = self.inliner.score();
        if expected != actual {
            return Err(BavetError::ScoreCorruption {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Checks that nothing is staged and every live tuple is settled.
    fn assert_quiescent(&self) -> Result<()> {
        if let Some(id) = self.nodes.iter().position(|entry| entry.out.len() > 0) {
            return Err(BavetError::illegal_state(format!(
                "node {} still has staged tuples after settling",
                id
            )));
        }
        if let Some((id, tuple)) = self
            .tuples
            .iter()
            .find(|(_, tuple)| tuple.state() != TupleState::Ok)
        {
            return Err(BavetError::illegal_state(format!(
                "{:?} is {:?} after settling",
                id,
                tuple.state()
            )));
        }
        Ok(())
    }

    /// Snapshot of the runtime state of every node.
    pub fn statistics(&self) -> SessionStatistics {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, entry)| {
                let (left_indexed, right_indexed) = entry.node.indexed();
                NodeStatistics {
                    id,
                    kind: entry.node.kind(),
                    layer: entry.layer,
                    staged: entry.out.len(),
                    left_indexed,
                    right_indexed,
                    buckets: entry.node.buckets(),
                }
            })
            .collect();
        SessionStatistics {
            facts: self.facts.len(),
            tuples: self.tuples.len(),
            ledger_entries: self.inliner.record_count(),
            layers: self.plan.layers.len(),
            nodes,
        }
    }

    /// Parent to child edges of the network, as `(parent, child)` node ids.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(parent, entry)| {
                entry
                    .children
                    .iter()
                    .map(move |edge| (parent, edge.child))
            })
            .collect()
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(BavetError::Poisoned);
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<()> {
        self.check_usable()?;
        if !self.settled {
            return Err(BavetError::illegal_state(
                "the session has changes that are not settled",
            ));
        }
        Ok(())
    }

    /// Poisons the session if `result` is an error.
    fn guarded<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!(event = "session_poisoned", error = %e);
            self.poisoned = true;
        }
        result
    }
}

impl<F: Fact, Sc: Score> fmt::Debug for Session<F, Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("facts", &self.facts.len())
            .field("tuples", &self.tuples.len())
            .field("score", &self.inliner.score())
            .field("settled", &self.settled)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

fn unknown_fact(handle: FactHandle) -> BavetError {
    BavetError::UnknownFact(format!("{:?}", handle))
}
