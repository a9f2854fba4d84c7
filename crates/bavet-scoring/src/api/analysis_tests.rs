//! Tests for score analysis types.

use bavet_core::{ConstraintRef, HardSoftScore, SimpleScore};
use bavet_test::Value;

use super::analysis::*;

fn conflict(score: i64, facts: &[Value]) -> ConstraintMatch<Value, SimpleScore> {
    ConstraintMatch {
        constraint_ref: ConstraintRef::new("", "Conflict"),
        score: SimpleScore::of(score),
        justification: Some(ConstraintJustification::new(facts.to_vec())),
        indicted: facts.to_vec(),
    }
}

#[test]
fn test_justification_description() {
    let justification = ConstraintJustification::new(vec![Value::Int(1), Value::text("a")]);
    assert_eq!(justification.description, "Int(1), Text(\"a\")");

    let empty = ConstraintJustification::<Value>::new(Vec::new());
    assert_eq!(empty.description, "No facts");

    let custom = ConstraintJustification::with_description(vec![Value::Int(1)], "overbooked");
    assert_eq!(custom.description, "overbooked");
}

#[test]
fn test_explanation_queries() {
    let analyses = vec![
        ConstraintAnalysis {
            constraint_ref: ConstraintRef::new("pkg", "Conflict"),
            weight: HardSoftScore::ONE_HARD,
            score: HardSoftScore::of_hard(-2),
            match_count: 2,
            matches: Vec::new(),
            is_hard: true,
        },
        ConstraintAnalysis {
            constraint_ref: ConstraintRef::new("pkg", "Idle"),
            weight: HardSoftScore::ONE_SOFT,
            score: HardSoftScore::ZERO,
            match_count: 0,
            matches: Vec::new(),
            is_hard: false,
        },
    ];
    let explanation: ScoreExplanation<Value, HardSoftScore> = ScoreExplanation {
        score: HardSoftScore::of_hard(-2),
        constraint_analyses: analyses,
    };

    assert_eq!(explanation.total_match_count(), 2);
    assert_eq!(explanation.non_zero_constraints().len(), 1);
    assert!(explanation.all_matches().is_empty());
    assert_eq!(explanation.get("pkg/Idle").map(|a| a.name()), Some("Idle"));
    assert!(explanation.get("Missing").is_none());
}

#[test]
fn test_indictment_map_groups_by_fact() {
    let a = Value::Int(1);
    let b = Value::Int(2);
    let c = Value::Int(3);
    let map = IndictmentMap::from_matches(vec![
        conflict(-1, &[a.clone(), b.clone()]),
        conflict(-3, &[a.clone(), c.clone()]),
    ]);

    assert_eq!(map.len(), 3);
    let indictment = map.get(&a).unwrap();
    assert_eq!(indictment.score, SimpleScore::of(-4));
    assert_eq!(indictment.match_count(), 2);
    assert_eq!(indictment.constraint_count(), 1);

    assert_eq!(map.worst_facts()[0], &a);
    assert_eq!(map.get(&b).unwrap().score, SimpleScore::of(-1));
}

#[test]
fn test_fact_indicted_twice_by_one_match_counts_once() {
    let a = Value::Int(1);
    let map = IndictmentMap::from_matches(vec![conflict(-1, &[a.clone(), a.clone()])]);
    assert_eq!(map.get(&a).unwrap().match_count(), 1);
}
