//! Weighted constraint definitions.

use std::fmt;
use std::sync::Arc;

use bavet_core::{ConstraintRef, Fact, ImpactType, Score};

use super::{StreamId, TupleMapper};
use crate::api::analysis::ConstraintJustification;

/// A scoring constraint: a stream whose every tuple impacts the score.
///
/// Each match contributes `weight × match_weight`, negated for penalties.
/// The match weight defaults to 1.
///
/// # Example
///
/// ```
/// use bavet_core::{ConstraintRef, HardSoftScore, ImpactType};
/// use bavet_scoring::stream::{ConstraintDef, ConstraintFactory};
/// use bavet_test::{Class, Value};
///
/// let mut factory = ConstraintFactory::<Value>::new();
/// let rooms = factory.for_each(Class::Room);
///
/// let constraint = ConstraintDef::reward(
///     ConstraintRef::new("timetable", "Seats"),
///     rooms,
///     HardSoftScore::ONE_SOFT,
/// )
/// .with_match_weight(|t: &[Value]| match &t[0] {
///     Value::Room { capacity, .. } => *capacity,
///     _ => 0,
/// });
///
/// assert_eq!(constraint.impact_type(), ImpactType::Reward);
/// assert_eq!(constraint.constraint_ref().name, "Seats");
/// ```
pub struct ConstraintDef<F: Fact, Sc: Score> {
    pub(crate) constraint_ref: ConstraintRef,
    pub(crate) stream: StreamId,
    pub(crate) weight: Sc,
    pub(crate) impact_type: ImpactType,
    pub(crate) match_weight: Option<TupleMapper<F, i64>>,
    pub(crate) justification: Option<TupleMapper<F, ConstraintJustification<F>>>,
    pub(crate) indictment: Option<TupleMapper<F, Vec<F>>>,
}

impl<F: Fact, Sc: Score> ConstraintDef<F, Sc> {
    /// Subtracts `weight` from the score for every tuple of `stream`.
    pub fn penalize(constraint_ref: ConstraintRef, stream: StreamId, weight: Sc) -> Self {
        Self::new(constraint_ref, stream, weight, ImpactType::Penalty)
    }

    /// Adds `weight` to the score for every tuple of `stream`.
    pub fn reward(constraint_ref: ConstraintRef, stream: StreamId, weight: Sc) -> Self {
        Self::new(constraint_ref, stream, weight, ImpactType::Reward)
    }

    fn new(
        constraint_ref: ConstraintRef,
        stream: StreamId,
        weight: Sc,
        impact_type: ImpactType,
    ) -> Self {
        Self {
            constraint_ref,
            stream,
            weight,
            impact_type,
            match_weight: None,
            justification: None,
            indictment: None,
        }
    }

    /// Scales the weight per match by an integer computed from the tuple.
    pub fn with_match_weight<W>(mut self, match_weight: W) -> Self
    where
        W: Fn(&[F]) -> i64 + Send + Sync + 'static,
    {
        self.match_weight = Some(Arc::new(match_weight));
        self
    }

    /// Replaces the default justification (the tuple's facts).
    pub fn justify_with<J>(mut self, justification: J) -> Self
    where
        J: Fn(&[F]) -> ConstraintJustification<F> + Send + Sync + 'static,
    {
        self.justification = Some(Arc::new(justification));
        self
    }

    /// Replaces the default indicted facts (the tuple's facts).
    pub fn indict_with<I>(mut self, indictment: I) -> Self
    where
        I: Fn(&[F]) -> Vec<F> + Send + Sync + 'static,
    {
        self.indictment = Some(Arc::new(indictment));
        self
    }

    pub fn constraint_ref(&self) -> &ConstraintRef {
        &self.constraint_ref
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Default weight, before overrides.
    pub fn weight(&self) -> Sc {
        self.weight
    }

    pub fn impact_type(&self) -> ImpactType {
        self.impact_type
    }
}

impl<F: Fact, Sc: Score> fmt::Debug for ConstraintDef<F, Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDef")
            .field("constraint_ref", &self.constraint_ref)
            .field("stream", &self.stream)
            .field("weight", &self.weight)
            .field("impact_type", &self.impact_type)
            .finish()
    }
}
