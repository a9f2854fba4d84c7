//! Compiled network layout shared by every session of one build.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bavet_config::{ConstraintMatchPolicy, EnvironmentMode};
use bavet_core::{BavetError, ConstraintRef, Fact, Result, Score};
use smallvec::SmallVec;
use tracing::debug;

use crate::api::analysis::ConstraintJustification;
use crate::api::weight_overrides::ConstraintWeightOverrides;
use crate::inliner::WeightedConstraint;
use crate::node::{
    ConcatNode, DistinctNode, Edge, ExistsNode, FilterNode, FlattenLastNode, GroupNode, JoinNode,
    MapNode, Node, NodeEntry, NodeId, OutputQueue, ScoreNode, Side, SourceNode,
};
use crate::stream::{ConstraintDef, Joiner, StreamDef, StreamKind, TupleMapper};

/// What a planned node does.
pub(crate) enum Operation<F: Fact> {
    Stream(StreamKind<F>),
    Score {
        constraint: usize,
        match_weight: Option<TupleMapper<F, i64>>,
        justification: Option<TupleMapper<F, ConstraintJustification<F>>>,
        indictment: Option<TupleMapper<F, Vec<F>>>,
    },
}

pub(crate) struct PlanNode<F: Fact> {
    pub(crate) operation: Operation<F>,
    /// Parent nodes, left input first.
    pub(crate) parents: SmallVec<[NodeId; 2]>,
    /// Slot owned in each parent's tuples, aligned with `parents`.
    pub(crate) slots: SmallVec<[usize; 2]>,
    pub(crate) children: SmallVec<[Edge; 2]>,
    pub(crate) layer: usize,
    /// Constraints fed by this node and its kind, for error reports.
    pub(crate) origin: String,
}

impl<F: Fact> PlanNode<F> {
    fn slot(&self, side: Side) -> usize {
        let position = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        self.slots.get(position).copied().unwrap_or_default()
    }

    /// Creates the runtime state of this node with empty indexes and queues.
    pub(crate) fn instantiate(&self) -> NodeEntry<F> {
        let origin = self.origin.clone();
        let left = self.slot(Side::Left);
        let node = match &self.operation {
            Operation::Stream(kind) => match kind {
                StreamKind::ForEach {
                    class,
                    include_unassigned,
                } => Node::Source(SourceNode::new(*class, *include_unassigned)),
                StreamKind::Filter { predicate, .. } => {
                    Node::Filter(FilterNode::new(origin, left, predicate.clone()))
                }
                StreamKind::Join { joiners, .. } => Node::Join(JoinNode::new(
                    origin,
                    left,
                    self.slot(Side::Right),
                    joiners,
                )),
                StreamKind::Exists {
                    joiners,
                    should_exist,
                    ..
                } => Node::Exists(ExistsNode::new(
                    origin,
                    left,
                    self.slot(Side::Right),
                    joiners,
                    *should_exist,
                )),
                StreamKind::GroupBy {
                    keys, collectors, ..
                } => Node::Group(GroupNode::new(
                    origin,
                    left,
                    keys.clone(),
                    collectors.clone(),
                )),
                StreamKind::Map { mappers, .. } => {
                    Node::Map(MapNode::new(origin, left, mappers.clone()))
                }
                StreamKind::FlattenLast { flattener, .. } => {
                    Node::FlattenLast(FlattenLastNode::new(origin, left, flattener.clone()))
                }
                StreamKind::Concat { .. } => {
                    Node::Concat(ConcatNode::new(left, self.slot(Side::Right)))
                }
                StreamKind::Distinct { .. } => Node::Distinct(DistinctNode::new(left)),
            },
            Operation::Score {
                constraint,
                match_weight,
                justification,
                indictment,
            } => Node::Score(ScoreNode::new(
                origin,
                left,
                *constraint,
                match_weight.clone(),
                justification.clone(),
                indictment.clone(),
            )),
        };
        NodeEntry {
            node,
            layer: self.layer,
            children: self.children.clone(),
            out: OutputQueue::new(self.children.len()),
        }
    }

    fn kind(&self) -> &'static str {
        match &self.operation {
            Operation::Stream(kind) => kind.name(),
            Operation::Score { .. } => "score",
        }
    }
}

/// The network of one session factory build: nodes in parent-first order,
/// their layers, and the weighted constraints they score.
///
/// A plan is immutable and shared through `Arc` by every session built from
/// it, including the throwaway sessions of from-scratch assertions.
pub struct SessionPlan<F: Fact, Sc: Score> {
    pub(crate) nodes: Vec<PlanNode<F>>,
    pub(crate) layers: Vec<Vec<NodeId>>,
    pub(crate) sources: HashMap<F::Class, SmallVec<[NodeId; 2]>>,
    pub(crate) constraints: Vec<WeightedConstraint<Sc>>,
    pub(crate) pruned: Vec<ConstraintRef>,
    pub(crate) policy: ConstraintMatchPolicy,
    pub(crate) environment_mode: EnvironmentMode,
}

impl<F: Fact, Sc: Score> SessionPlan<F, Sc> {
    /// Number of nodes, score nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Constraints that are scored, in definition order.
    pub fn constraints(&self) -> &[WeightedConstraint<Sc>] {
        &self.constraints
    }

    /// Constraints left out because their weight resolved to zero.
    pub fn pruned(&self) -> &[ConstraintRef] {
        &self.pruned
    }

    pub fn policy(&self) -> ConstraintMatchPolicy {
        self.policy
    }

    pub fn environment_mode(&self) -> EnvironmentMode {
        self.environment_mode
    }
}

/// Structural identity of a stream, used to build shared sub-streams once.
///
/// Parents are node ids, so two definitions over equal parents compare equal;
/// user functions are compared by `Arc` pointer.
#[derive(PartialEq, Eq, Hash)]
struct ShareKey<C> {
    operation: &'static str,
    class: Option<C>,
    parents: SmallVec<[NodeId; 2]>,
    functions: Vec<usize>,
}

fn address<T: ?Sized>(function: &Arc<T>) -> usize {
    Arc::as_ptr(function) as *const () as usize
}

fn joiner_addresses<F>(joiners: &[Joiner<F>], functions: &mut Vec<usize>) {
    for joiner in joiners {
        match joiner {
            Joiner::Equal { left, right } => {
                functions.extend([0, address(left), address(right)]);
            }
            Joiner::Filtering(predicate) => functions.extend([1, address(predicate)]),
        }
    }
}

fn share_key<F: Fact>(kind: &StreamKind<F>, parents: SmallVec<[NodeId; 2]>) -> ShareKey<F::Class> {
    let mut functions = Vec::new();
    let mut class = None;
    match kind {
        StreamKind::ForEach { class: c, .. } => class = Some(*c),
        StreamKind::Filter { predicate, .. } => functions.push(address(predicate)),
        StreamKind::Join { joiners, .. } => joiner_addresses(joiners, &mut functions),
        StreamKind::Exists { joiners, .. } => joiner_addresses(joiners, &mut functions),
        StreamKind::GroupBy {
            keys, collectors, ..
        } => {
            functions.extend(keys.iter().map(address));
            functions.push(usize::MAX);
            functions.extend(collectors.iter().map(address));
        }
        StreamKind::Map { mappers, .. } => functions.extend(mappers.iter().map(address)),
        StreamKind::FlattenLast { flattener, .. } => functions.push(address(flattener)),
        StreamKind::Concat { .. } | StreamKind::Distinct { .. } => {}
    }
    ShareKey {
        operation: kind.name(),
        class,
        parents,
        functions,
    }
}

/// Compiles the plan for one set of resolved weights.
///
/// Steps: resolve weights and prune zero-weight constraints, collect the
/// streams the remaining constraints reach, share structurally identical
/// streams while instantiating them parent-first, append one score node per
/// constraint, then wire children, assign layers and bucket nodes by layer.
pub(crate) fn compile<F: Fact, Sc: Score>(
    streams: &[StreamDef<F>],
    definitions: &[ConstraintDef<F, Sc>],
    weights: &ConstraintWeightOverrides<Sc>,
    policy: ConstraintMatchPolicy,
    environment_mode: EnvironmentMode,
) -> Result<SessionPlan<F, Sc>> {
    let known: Vec<ConstraintRef> = definitions
        .iter()
        .map(|d| d.constraint_ref.clone())
        .collect();
    weights.validate(&known)?;

    let mut active = Vec::new();
    let mut constraints = Vec::new();
    let mut pruned = Vec::new();
    for definition in definitions {
        let weight = weights.resolve(&definition.constraint_ref, definition.weight);
        if weight.is_zero() {
            debug!(
                event = "constraint_pruned",
                constraint = %definition.constraint_ref.full_name(),
            );
            pruned.push(definition.constraint_ref.clone());
            continue;
        }
        active.push(definition);
        constraints.push(WeightedConstraint::new(
            definition.constraint_ref.clone(),
            weight,
            definition.impact_type,
        ));
    }

    // Parents always precede their children in the factory, so one reverse
    // sweep marks every reachable stream.
    let mut reachable = vec![false; streams.len()];
    for definition in &active {
        reachable[definition.stream.index()] = true;
    }
    for index in (0..streams.len()).rev() {
        if reachable[index] {
            for parent in streams[index].kind.parents() {
                reachable[parent.index()] = true;
            }
        }
    }

    let mut nodes: Vec<PlanNode<F>> = Vec::new();
    let mut node_of: Vec<Option<NodeId>> = vec![None; streams.len()];
    let mut shared: HashMap<ShareKey<F::Class>, NodeId> = HashMap::new();
    let mut sources: HashMap<F::Class, SmallVec<[NodeId; 2]>> = HashMap::new();
    for (index, stream) in streams.iter().enumerate() {
        if !reachable[index] {
            continue;
        }
        let parents = stream
            .kind
            .parents()
            .into_iter()
            .map(|parent| {
                node_of[parent.index()].ok_or_else(|| {
                    BavetError::illegal_state(format!("{:?} is built before its parent", parent))
                })
            })
            .collect::<Result<SmallVec<[NodeId; 2]>>>()?;
        let key = share_key(&stream.kind, parents.clone());
        if let Some(&existing) = shared.get(&key) {
            node_of[index] = Some(existing);
            continue;
        }

        let id = nodes.len();
        if let StreamKind::ForEach { class, .. } = &stream.kind {
            let entry = sources.entry(*class).or_default();
            if entry.len() == 2 {
                return Err(BavetError::illegal_state(format!(
                    "a third source node for {:?}",
                    class
                )));
            }
            entry.push(id);
        }
        nodes.push(PlanNode {
            operation: Operation::Stream(stream.kind.clone()),
            parents,
            slots: SmallVec::new(),
            children: SmallVec::new(),
            layer: 0,
            origin: String::new(),
        });
        shared.insert(key, id);
        node_of[index] = Some(id);
    }

    for (constraint, definition) in active.iter().enumerate() {
        let parent = node_of[definition.stream.index()].ok_or_else(|| {
            BavetError::illegal_state(format!("{:?} was not built", definition.stream))
        })?;
        nodes.push(PlanNode {
            operation: Operation::Score {
                constraint,
                match_weight: definition.match_weight.clone(),
                justification: definition.justification.clone(),
                indictment: definition.indictment.clone(),
            },
            parents: SmallVec::from_elem(parent, 1),
            slots: SmallVec::new(),
            children: SmallVec::new(),
            layer: 0,
            origin: String::new(),
        });
    }

    for id in 0..nodes.len() {
        let parents = nodes[id].parents.clone();
        let mut layer = 0;
        for (position, &parent) in parents.iter().enumerate() {
            let side = if position == 0 { Side::Left } else { Side::Right };
            let slot = nodes[parent].children.len();
            nodes[parent].children.push(Edge { child: id, side });
            nodes[id].slots.push(slot);
            layer = layer.max(nodes[parent].layer + 1);
        }
        nodes[id].layer = layer;
    }

    // Every node learns which constraints it feeds, for error reports.
    let mut feeds: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    for id in (0..nodes.len()).rev() {
        if let Operation::Score { constraint, .. } = nodes[id].operation {
            feeds[id].insert(constraint);
        }
        let fed = feeds[id].clone();
        for &parent in &nodes[id].parents {
            feeds[parent].extend(fed.iter().copied());
        }
    }
    for (node, fed) in nodes.iter_mut().zip(&feeds) {
        let names: Vec<String> = fed
            .iter()
            .map(|&c| constraints[c].constraint_ref.full_name())
            .collect();
        node.origin = format!("{} ({})", names.join(", "), node.kind());
    }

    let layer_count = nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0);
    let mut layers = vec![Vec::new(); layer_count];
    for (id, node) in nodes.iter().enumerate() {
        layers[node.layer].push(id);
    }

    debug!(
        event = "plan_compiled",
        constraints = constraints.len(),
        pruned = pruned.len(),
        nodes = nodes.len(),
        layers = layers.len(),
    );

    Ok(SessionPlan {
        nodes,
        layers,
        sources,
        constraints,
        pruned,
        policy,
        environment_mode,
    })
}
