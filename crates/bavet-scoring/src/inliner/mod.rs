//! Score inliner: turns constraint matches into running score deltas.
//!
//! Every score node calls [`ScoreInliner::impact`] once per matching tuple
//! and keeps the returned [`ScoreImpact`] in the tuple's slot. Handing the
//! token back to [`ScoreInliner::undo`] reverses the delta and any ledger
//! entry exactly.
//!
//! How much is recorded per match is fixed by the [`ConstraintMatchPolicy`]
//! chosen when the session is built:
//!
//! - `Disabled`: totals only; the token carries everything needed to undo.
//! - `Enabled`: each match's score is kept in a ledger.
//! - `EnabledWithJustifications`: ledger entries also carry justification
//!   and indicted facts.
//!
//! # Example
//!
//! ```
//! use bavet_config::ConstraintMatchPolicy;
//! use bavet_core::{ConstraintRef, ImpactType, Score, SimpleScore};
//! use bavet_scoring::inliner::{ScoreInliner, WeightedConstraint};
//! use bavet_test::Value;
//!
//! let mut inliner: ScoreInliner<Value, SimpleScore> = ScoreInliner::new(
//!     ConstraintMatchPolicy::Disabled,
//!     vec![WeightedConstraint::new(
//!         ConstraintRef::new("", "Conflict"),
//!         SimpleScore::of(2),
//!         ImpactType::Penalty,
//!     )],
//! );
//!
//! let impact = inliner.impact(0, 3, None).unwrap();
//! assert_eq!(inliner.score(), SimpleScore::of(-6));
//!
//! inliner.undo(impact);
//! assert!(inliner.score().is_zero());
//! ```

#[cfg(test)]
mod tests;

use bavet_config::ConstraintMatchPolicy;
use bavet_core::{BavetError, ConstraintRef, ImpactType, Result, Score};

use crate::api::analysis::ConstraintJustification;

/// A constraint as seen by the inliner: its identity, weight and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedConstraint<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub weight: Sc,
    pub impact_type: ImpactType,
}

impl<Sc: Score> WeightedConstraint<Sc> {
    pub fn new(constraint_ref: ConstraintRef, weight: Sc, impact_type: ImpactType) -> Self {
        Self {
            constraint_ref,
            weight,
            impact_type,
        }
    }

    /// Signed score delta of one match with the given match weight.
    ///
    /// Fails when the signed match weight does not fit in an `i64`.
    #[inline]
    pub fn delta(&self, match_weight: i64) -> Result<Sc> {
        signed_delta(self.weight, self.impact_type, match_weight)
            .ok_or_else(|| overflow(&self.constraint_ref, match_weight))
    }
}

/// Running totals of one constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTotal<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub weight: Sc,
    pub impact_type: ImpactType,
    /// Sum of the deltas of all live matches.
    pub score: Sc,
    /// Number of live matches.
    pub match_count: usize,
}

/// Explanation payload of one match, materialized only with justifications enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetail<F> {
    pub justification: ConstraintJustification<F>,
    pub indicted: Vec<F>,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord<F, Sc> {
    pub constraint: usize,
    pub match_weight: i64,
    pub score: Sc,
    pub detail: Option<MatchDetail<F>>,
}

/// Token that reverses one [`ScoreInliner::impact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreImpact {
    constraint: u32,
    match_weight: i64,
    entry: Option<u32>,
}

impl ScoreImpact {
    /// Index of the impacted constraint.
    pub fn constraint(&self) -> usize {
        self.constraint as usize
    }

    /// Match weight the impact was computed with.
    pub fn match_weight(&self) -> i64 {
        self.match_weight
    }
}

/// Per-session score accumulator shared by all score nodes.
pub struct ScoreInliner<F, Sc: Score> {
    policy: ConstraintMatchPolicy,
    constraints: Vec<ConstraintTotal<Sc>>,
    score: Sc,
    ledger: Vec<Option<MatchRecord<F, Sc>>>,
    free: Vec<u32>,
}

impl<F, Sc: Score> ScoreInliner<F, Sc> {
    /// Creates an inliner with zero totals for every constraint.
    pub fn new(policy: ConstraintMatchPolicy, constraints: Vec<WeightedConstraint<Sc>>) -> Self {
        let constraints = constraints
            .into_iter()
            .map(|c| ConstraintTotal {
                constraint_ref: c.constraint_ref,
                weight: c.weight,
                impact_type: c.impact_type,
                score: Sc::zero(),
                match_count: 0,
            })
            .collect();
        Self {
            policy,
            constraints,
            score: Sc::zero(),
            ledger: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn policy(&self) -> ConstraintMatchPolicy {
        self.policy
    }

    /// Returns true if score nodes must compute a [`MatchDetail`] per match.
    #[inline]
    pub fn requires_detail(&self) -> bool {
        self.policy.is_justification_enabled()
    }

    /// Adds the delta of one match of `constraint`.
    ///
    /// `detail` is ignored unless justifications are enabled.
    ///
    /// Fails without changing any total when the signed match weight
    /// overflows.
    ///
    /// # Panics
    ///
    /// Panics if `constraint` is out of range.
    pub fn impact(
        &mut self,
        constraint: usize,
        match_weight: i64,
        detail: Option<MatchDetail<F>>,
    ) -> Result<ScoreImpact> {
        let totals = &mut self.constraints[constraint];
        let delta = signed_delta(totals.weight, totals.impact_type, match_weight)
            .ok_or_else(|| overflow(&totals.constraint_ref, match_weight))?;
        totals.score = totals.score + delta;
        totals.match_count += 1;
        self.score = self.score + delta;

        let entry = if self.policy.is_enabled() {
            let record = MatchRecord {
                constraint,
                match_weight,
                score: delta,
                detail: if self.policy.is_justification_enabled() {
                    detail
                } else {
                    None
                },
            };
            Some(self.push_record(record))
        } else {
            None
        };

        Ok(ScoreImpact {
            constraint: constraint as u32,
            match_weight,
            entry,
        })
    }

    /// Reverses an earlier impact.
    pub fn undo(&mut self, impact: ScoreImpact) {
        let totals = &mut self.constraints[impact.constraint()];
        let delta = totals
            .weight
            .scale(impact.match_weight * totals.impact_type.sign());
        totals.score = totals.score - delta;
        totals.match_count -= 1;
        self.score = self.score - delta;

        if let Some(entry) = impact.entry {
            self.release_record(entry);
        }
    }

    fn push_record(&mut self, record: MatchRecord<F, Sc>) -> u32 {
        match self.free.pop() {
            Some(entry) => {
                self.ledger[entry as usize] = Some(record);
                entry
            }
            None => {
                self.ledger.push(Some(record));
                (self.ledger.len() - 1) as u32
            }
        }
    }

    fn release_record(&mut self, entry: u32) {
        if entry as usize + 1 == self.ledger.len() {
            self.ledger.pop();
            // Trailing holes go too, so the ledger shrinks back to its
            // shape before the released impacts.
            while let Some(None) = self.ledger.last() {
                self.ledger.pop();
            }
            let len = self.ledger.len() as u32;
            self.free.retain(|&free| free < len);
        } else {
            self.ledger[entry as usize] = None;
            self.free.push(entry);
        }
    }

    /// Ledger slots including holes left by released entries.
    pub fn ledger_capacity(&self) -> usize {
        self.ledger.len()
    }

    /// Sum of all live impacts.
    #[inline]
    pub fn score(&self) -> Sc {
        self.score
    }

    /// Totals per constraint, in constraint order.
    pub fn totals(&self) -> &[ConstraintTotal<Sc>] {
        &self.constraints
    }

    /// Live ledger entries. Empty when matches are not recorded.
    pub fn records(&self) -> impl Iterator<Item = &MatchRecord<F, Sc>> {
        self.ledger.iter().flatten()
    }

    /// Number of live ledger entries.
    pub fn record_count(&self) -> usize {
        self.ledger.len() - self.free.len()
    }
}

fn signed_delta<Sc: Score>(weight: Sc, impact_type: ImpactType, match_weight: i64) -> Option<Sc> {
    match_weight
        .checked_mul(impact_type.sign())
        .map(|signed| weight.scale(signed))
}

fn overflow(constraint: &ConstraintRef, match_weight: i64) -> BavetError {
    BavetError::illegal_state(format!(
        "match weight {} of {} overflows when signed",
        match_weight, constraint
    ))
}
