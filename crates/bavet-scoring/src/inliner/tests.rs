//! Tests for the score inliner tiers.

use bavet_config::ConstraintMatchPolicy;
use bavet_core::{BavetError, ConstraintRef, HardSoftScore, ImpactType, Score};
use bavet_test::Value;

use super::*;
use crate::api::analysis::ConstraintJustification;

fn inliner(policy: ConstraintMatchPolicy) -> ScoreInliner<Value, HardSoftScore> {
    ScoreInliner::new(
        policy,
        vec![
            WeightedConstraint::new(
                ConstraintRef::new("timetable", "Room conflict"),
                HardSoftScore::ONE_HARD,
                ImpactType::Penalty,
            ),
            WeightedConstraint::new(
                ConstraintRef::new("timetable", "Preferred room"),
                HardSoftScore::of_soft(3),
                ImpactType::Reward,
            ),
        ],
    )
}

fn detail(facts: &[Value]) -> MatchDetail<Value> {
    MatchDetail {
        justification: ConstraintJustification::new(facts.to_vec()),
        indicted: facts.to_vec(),
    }
}

#[test]
fn test_delta_is_weight_times_match_weight_signed() {
    let mut inliner = inliner(ConstraintMatchPolicy::Disabled);
    inliner.impact(0, 2, None).unwrap();
    inliner.impact(1, 1, None).unwrap();

    assert_eq!(inliner.score(), HardSoftScore::of(-2, 3));
    assert_eq!(inliner.totals()[0].score, HardSoftScore::of_hard(-2));
    assert_eq!(inliner.totals()[0].match_count, 1);
    assert_eq!(inliner.totals()[1].score, HardSoftScore::of_soft(3));
}

#[test]
fn test_disabled_tier_keeps_no_ledger() {
    let mut inliner = inliner(ConstraintMatchPolicy::Disabled);
    let impact = inliner.impact(0, 1, Some(detail(&[Value::Int(1)]))).unwrap();
    assert_eq!(inliner.record_count(), 0);
    assert_eq!(inliner.records().count(), 0);

    inliner.undo(impact);
    assert!(inliner.score().is_zero());
    assert_eq!(inliner.totals()[0].match_count, 0);
}

#[test]
fn test_enabled_tier_records_scores_without_detail() {
    let mut inliner = inliner(ConstraintMatchPolicy::Enabled);
    assert!(!inliner.requires_detail());
    inliner.impact(0, 1, Some(detail(&[Value::Int(1)]))).unwrap();

    let records: Vec<_> = inliner.records().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, HardSoftScore::of_hard(-1));
    assert!(records[0].detail.is_none());
}

#[test]
fn test_full_tier_records_detail() {
    let mut inliner = inliner(ConstraintMatchPolicy::EnabledWithJustifications);
    assert!(inliner.requires_detail());
    inliner.impact(1, 2, Some(detail(&[Value::Int(1), Value::Int(2)]))).unwrap();

    let record = inliner.records().next().unwrap();
    let detail = record.detail.as_ref().unwrap();
    assert_eq!(detail.indicted, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(record.score, HardSoftScore::of_soft(6));
}

#[test]
fn test_impact_then_undo_restores_totals_and_ledger() {
    for policy in [
        ConstraintMatchPolicy::Disabled,
        ConstraintMatchPolicy::Enabled,
        ConstraintMatchPolicy::EnabledWithJustifications,
    ] {
        let mut inliner = inliner(policy);
        let kept = inliner.impact(0, 1, Some(detail(&[Value::Int(1)]))).unwrap();
        inliner.impact(1, 4, Some(detail(&[Value::Int(2)]))).unwrap();
        inliner.undo(kept);

        let score = inliner.score();
        let totals = inliner.totals().to_vec();
        let records: Vec<_> = inliner.records().cloned().collect();

        let impact = inliner.impact(0, 7, Some(detail(&[Value::Int(3)]))).unwrap();
        assert_ne!(inliner.score(), score);
        inliner.undo(impact);

        assert_eq!(inliner.score(), score);
        assert_eq!(inliner.totals(), totals.as_slice());
        assert_eq!(inliner.records().cloned().collect::<Vec<_>>(), records);
    }
}

#[test]
fn test_ledger_slots_are_reused() {
    let mut inliner = inliner(ConstraintMatchPolicy::Enabled);
    let a = inliner.impact(0, 1, None).unwrap();
    let _b = inliner.impact(0, 1, None).unwrap();
    inliner.undo(a);
    assert_eq!(inliner.record_count(), 1);

    inliner.impact(0, 1, None).unwrap();
    assert_eq!(inliner.record_count(), 2);
    assert_eq!(inliner.totals()[0].match_count, 2);
}

#[test]
fn test_releasing_the_tail_shrinks_the_ledger() {
    let mut inliner = inliner(ConstraintMatchPolicy::Enabled);
    let _a = inliner.impact(0, 1, None).unwrap();
    let b = inliner.impact(0, 2, None).unwrap();
    let c = inliner.impact(0, 3, None).unwrap();
    inliner.undo(b);
    inliner.undo(c);
    assert_eq!(inliner.ledger_capacity(), 1);
    assert_eq!(inliner.record_count(), 1);

    let impact = inliner.impact(1, 1, None).unwrap();
    assert_eq!(inliner.ledger_capacity(), 2);
    inliner.undo(impact);
    assert_eq!(inliner.ledger_capacity(), 1);
    assert_eq!(inliner.records().map(|r| r.match_weight).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_overflowing_match_weight_is_rejected() {
    let mut inliner = inliner(ConstraintMatchPolicy::Enabled);
    let err = inliner.impact(0, i64::MIN, None).unwrap_err();
    assert!(matches!(err, BavetError::IllegalState(_)));
    assert!(inliner.score().is_zero());
    assert_eq!(inliner.totals()[0].match_count, 0);
    assert_eq!(inliner.record_count(), 0);

    // Rewards keep the sign of the match weight.
    assert!(inliner.impact(1, -5, None).is_ok());
    assert_eq!(inliner.score(), HardSoftScore::of_soft(-15));
}
