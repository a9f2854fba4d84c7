use bavet_core::{BavetError, Fact, Result, Score};

use super::{guard, install, not_inserted, Propagation};
use crate::api::analysis::ConstraintJustification;
use crate::inliner::{MatchDetail, ScoreImpact};
use crate::stream::TupleMapper;
use crate::tuple::{Slot, TupleId};

/// Terminal node of one constraint: every tuple it holds is one match.
pub(crate) struct ScoreNode<F: Fact> {
    origin: String,
    slot: usize,
    constraint: usize,
    match_weight: Option<TupleMapper<F, i64>>,
    justification: Option<TupleMapper<F, ConstraintJustification<F>>>,
    indictment: Option<TupleMapper<F, Vec<F>>>,
}

impl<F: Fact> ScoreNode<F> {
    pub(crate) fn new(
        origin: String,
        slot: usize,
        constraint: usize,
        match_weight: Option<TupleMapper<F, i64>>,
        justification: Option<TupleMapper<F, ConstraintJustification<F>>>,
        indictment: Option<TupleMapper<F, Vec<F>>>,
    ) -> Self {
        Self {
            origin,
            slot,
            constraint,
            match_weight,
            justification,
            indictment,
        }
    }

    fn impact<Sc: Score>(
        &self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<ScoreImpact> {
        let facts = cx.tuples.facts(tuple)?;
        let match_weight = match &self.match_weight {
            Some(weigh) => guard(&self.origin, facts, || weigh(facts))?,
            None => 1,
        };
        let detail = if cx.inliner.requires_detail() {
            let justification = match &self.justification {
                Some(justify) => guard(&self.origin, facts, || justify(facts))?,
                None => ConstraintJustification::new(facts.to_vec()),
            };
            let indicted = match &self.indictment {
                Some(indict) => guard(&self.origin, facts, || indict(facts))?,
                None => facts.to_vec(),
            };
            Some(MatchDetail {
                justification,
                indicted,
            })
        } else {
            None
        };
        cx.inliner
            .impact(self.constraint, match_weight, detail)
            .map_err(|e| BavetError::UserFunction {
                constraint: self.origin.clone(),
                facts: format!("{:?}", facts),
                message: e.to_string(),
            })
    }

    pub(crate) fn insert<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        let impact = self.impact(tuple, cx)?;
        install(cx.tuples, tuple, self.slot, Slot::Score(impact))
    }

    pub(crate) fn update<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Score(previous) => cx.inliner.undo(previous),
            other => return Err(not_inserted(tuple, &other)),
        }
        let impact = self.impact(tuple, cx)?;
        cx.tuples.set_slot(tuple, self.slot, Slot::Score(impact))
    }

    pub(crate) fn retract<Sc: Score>(
        &mut self,
        tuple: TupleId,
        cx: &mut Propagation<'_, F, Sc>,
    ) -> Result<()> {
        match cx.tuples.take_slot(tuple, self.slot)? {
            Slot::Score(impact) => {
                cx.inliner.undo(impact);
                Ok(())
            }
            other => Err(not_inserted(tuple, &other)),
        }
    }
}
