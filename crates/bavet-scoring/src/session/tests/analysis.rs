//! Explanations, indictments and self-checking environment modes.

use std::sync::atomic::{AtomicI64, Ordering};

use bavet_config::{ConstraintMatchPolicy, EnvironmentMode, SessionConfig};
use bavet_core::{BavetError, ConstraintRef, SimpleScore};
use bavet_test::{nqueens, timetable, Class, Value};

use super::{build_with, nqueens_constraints, Session};
use crate::api::analysis::ConstraintJustification;
use crate::stream::{ConstraintDef, ConstraintFactory};

fn three_queens(policy: ConstraintMatchPolicy) -> Session<Value, SimpleScore> {
    let mut factory = ConstraintFactory::new();
    let constraints = nqueens_constraints(&mut factory);
    let mut session = build_with(
        factory,
        constraints,
        SessionConfig::default().with_constraint_match_policy(policy),
    );
    // One row conflict (0, 1) and one diagonal conflict (0, 2).
    for queen in nqueens::queens_with_rows(&[0, 0, 2]) {
        session.insert(queen).unwrap();
    }
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-2));
    session
}

#[test]
fn test_disabled_policy_keeps_totals_only() {
    let session = three_queens(ConstraintMatchPolicy::Disabled);
    let explanation = session.explain().unwrap();

    assert_eq!(explanation.score, SimpleScore::of(-2));
    assert_eq!(explanation.total_match_count(), 2);
    assert_eq!(explanation.non_zero_constraints().len(), 2);
    let rows = explanation.get("Row conflict").unwrap();
    assert_eq!(rows.score, SimpleScore::of(-1));
    assert!(rows.matches.is_empty());
    assert!(session.indict().unwrap().is_empty());
    assert_eq!(session.statistics().ledger_entries, 0);
}

#[test]
fn test_enabled_policy_records_match_scores() {
    let session = three_queens(ConstraintMatchPolicy::Enabled);
    let explanation = session.explain().unwrap();

    let matches = explanation.all_matches();
    assert_eq!(matches.len(), 2);
    for m in matches {
        assert_eq!(m.score, SimpleScore::of(-1));
        assert!(m.justification.is_none());
        assert!(m.indicted.is_empty());
    }
    assert!(session.indict().unwrap().is_empty());
    assert_eq!(session.statistics().ledger_entries, 2);
}

#[test]
fn test_justifications_and_indictments() {
    let session = three_queens(ConstraintMatchPolicy::EnabledWithJustifications);
    let queens = nqueens::queens_with_rows(&[0, 0, 2]);
    let explanation = session.explain().unwrap();

    let rows = explanation.get("nqueens/Row conflict").unwrap();
    assert_eq!(rows.match_count(), 1);
    let justification = rows.matches[0].justification.as_ref().unwrap();
    assert_eq!(justification.facts, vec![queens[0].clone(), queens[1].clone()]);
    assert_eq!(rows.matches[0].indicted, justification.facts);

    let indictments = session.indict().unwrap();
    assert_eq!(indictments.len(), 3);
    let first = indictments.get(&queens[0]).unwrap();
    assert_eq!(first.score, SimpleScore::of(-2));
    assert_eq!(first.match_count(), 2);
    assert_eq!(first.constraint_count(), 2);
    assert_eq!(indictments.get(&queens[2]).unwrap().score, SimpleScore::of(-1));
    assert_eq!(indictments.worst_facts()[0], &queens[0]);
}

#[test]
fn test_custom_justification_and_indictment() {
    let mut factory = ConstraintFactory::new();
    let lessons = factory.for_each_including_unassigned(Class::Lesson);
    let unassigned = factory
        .filter(lessons, |t: &[Value]| !bavet_core::Fact::is_assigned(&t[0]))
        .unwrap();
    let constraints = vec![ConstraintDef::penalize(
        ConstraintRef::new("timetable", "Unassigned lesson"),
        unassigned,
        SimpleScore::ONE,
    )
    .justify_with(|t: &[Value]| {
        ConstraintJustification::with_description(t.to_vec(), "lesson has no slot")
    })
    .indict_with(|_: &[Value]| vec![Value::text("planner")])];
    let mut session = build_with(
        factory,
        constraints,
        SessionConfig::default()
            .with_constraint_match_policy(ConstraintMatchPolicy::EnabledWithJustifications),
    );

    let open = timetable::lesson(0, 0, Some(1), None);
    let handle = session.insert(open.clone()).unwrap();
    session.settle().unwrap();

    let explanation = session.explain().unwrap();
    let matches = explanation.all_matches();
    let justification = matches[0].justification.as_ref().unwrap();
    assert_eq!(justification.description, "lesson has no slot");
    assert_eq!(justification.facts, vec![open]);
    let indictments = session.indict().unwrap();
    assert_eq!(indictments.len(), 1);
    assert!(indictments.get(&Value::text("planner")).is_some());

    session
        .update(handle, timetable::assigned_lesson(0, 0, 1, 0))
        .unwrap();
    session.settle().unwrap();
    assert!(session.indict().unwrap().is_empty());
    assert_eq!(session.statistics().ledger_entries, 0);
}

#[test]
fn test_reads_require_a_settled_session() {
    let mut session = three_queens(ConstraintMatchPolicy::Enabled);
    session.insert(nqueens::queen(3, 3, 0)).unwrap();

    assert!(!session.is_settled());
    assert!(matches!(session.explain(), Err(BavetError::IllegalState(_))));
    assert!(matches!(session.indict(), Err(BavetError::IllegalState(_))));
    assert!(matches!(
        session.constraint_totals(),
        Err(BavetError::IllegalState(_))
    ));
    assert!(!session.is_poisoned());

    session.settle().unwrap();
    assert!(session.explain().is_ok());
}

static SEAT_VALUE: AtomicI64 = AtomicI64::new(1);

fn seat_session(mode: EnvironmentMode) -> Session<Value, SimpleScore> {
    let mut factory = ConstraintFactory::new();
    let rooms = factory.for_each(Class::Room);
    let constraints = vec![ConstraintDef::reward(
        ConstraintRef::new("", "Seat value"),
        rooms,
        SimpleScore::ONE,
    )
    .with_match_weight(|_: &[Value]| SEAT_VALUE.load(Ordering::SeqCst))];
    build_with(
        factory,
        constraints,
        SessionConfig::default().with_environment_mode(mode),
    )
}

// Only this test may touch SEAT_VALUE.
#[test]
fn test_drifting_match_weight_is_detected() {
    SEAT_VALUE.store(1, Ordering::SeqCst);
    let mut checked = seat_session(EnvironmentMode::FullAssert);
    let mut unchecked = seat_session(EnvironmentMode::FastAssert);
    checked.insert(timetable::room(0, 10)).unwrap();
    unchecked.insert(timetable::room(0, 10)).unwrap();
    assert_eq!(checked.settle().unwrap(), SimpleScore::of(1));
    assert_eq!(unchecked.settle().unwrap(), SimpleScore::of(1));

    SEAT_VALUE.store(5, Ordering::SeqCst);
    checked.insert(timetable::room(1, 10)).unwrap();
    unchecked.insert(timetable::room(1, 10)).unwrap();

    match checked.settle().unwrap_err() {
        BavetError::ScoreCorruption { expected, actual } => {
            assert_eq!(expected, "10");
            assert_eq!(actual, "6");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(checked.is_poisoned());

    assert_eq!(unchecked.settle().unwrap(), SimpleScore::of(6));
    assert!(matches!(
        unchecked.assert_from_scratch(),
        Err(BavetError::ScoreCorruption { .. })
    ));
    assert!(!unchecked.is_poisoned());
    SEAT_VALUE.store(1, Ordering::SeqCst);
}
