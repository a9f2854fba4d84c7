//! Incremental results must match a batch recomputation, whatever the order
//! and batching of the mutations that produced them.

use bavet_config::{ConstraintMatchPolicy, EnvironmentMode, SessionConfig};
use bavet_core::{HardSoftScore, SimpleScore};
use bavet_test::{nqueens, timetable, Value};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{
    build, build_with, nqueens_constraints, timetable_constraints, timetable_score, FactHandle,
};
use crate::stream::ConstraintFactory;

fn random_queen(rng: &mut StdRng, id: i64, n: i64) -> Value {
    if rng.random_bool(0.2) {
        nqueens::unassigned_queen(id, id % n)
    } else {
        nqueens::queen(id, id % n, rng.random_range(0..n))
    }
}

fn random_lesson(rng: &mut StdRng, id: u32) -> Value {
    let room = rng.random_bool(0.85).then(|| rng.random_range(0..3));
    let timeslot = rng.random_bool(0.85).then(|| rng.random_range(0..4));
    timetable::lesson(id, rng.random_range(0..3), room, timeslot)
}

fn live_values(live: &[(FactHandle, Value)]) -> Vec<Value> {
    live.iter().map(|(_, v)| v.clone()).collect()
}

fn run_nqueens(seed: u64, config: SessionConfig) {
    const N: i64 = 8;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut factory = ConstraintFactory::new();
    let constraints = nqueens_constraints(&mut factory);
    let mut session = build_with(factory, constraints, config);

    let mut live: Vec<(FactHandle, Value)> = Vec::new();
    let mut next_id = 0;
    for _ in 0..N {
        let queen = random_queen(&mut rng, next_id, N);
        next_id += 1;
        live.push((session.insert(queen.clone()).unwrap(), queen));
    }
    assert_eq!(
        session.settle().unwrap(),
        SimpleScore::of(nqueens::calculate_conflicts(&live_values(&live)))
    );

    for _ in 0..60 {
        for _ in 0..rng.random_range(1..4) {
            match rng.random_range(0..10) {
                0 if !live.is_empty() => {
                    let (handle, queen) = live.swap_remove(rng.random_range(0..live.len()));
                    assert_eq!(session.retract(handle).unwrap(), queen);
                }
                1 => {
                    let queen = random_queen(&mut rng, next_id, N);
                    next_id += 1;
                    live.push((session.insert(queen.clone()).unwrap(), queen));
                }
                _ if !live.is_empty() => {
                    let at = rng.random_range(0..live.len());
                    let (id, _, _) = nqueens::queen_parts(&live[at].1);
                    let queen = random_queen(&mut rng, id, N);
                    session.update(live[at].0, queen.clone()).unwrap();
                    live[at].1 = queen;
                }
                _ => {}
            }
        }
        let expected = nqueens::calculate_conflicts(&live_values(&live));
        assert_eq!(session.settle().unwrap(), SimpleScore::of(expected));
        assert_eq!(session.statistics().staged(), 0);
    }
    session.assert_from_scratch().unwrap();
}

#[test]
fn test_nqueens_random_mutations_match_batch_count() {
    for seed in 0..5 {
        run_nqueens(seed, SessionConfig::default());
    }
}

#[test]
fn test_nqueens_random_mutations_under_full_assert() {
    run_nqueens(
        42,
        SessionConfig::default()
            .with_environment_mode(EnvironmentMode::FullAssert)
            .with_constraint_match_policy(ConstraintMatchPolicy::EnabledWithJustifications),
    );
}

#[test]
fn test_timetable_random_mutations_match_batch_count() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut factory = ConstraintFactory::new();
    let constraints = timetable_constraints(&mut factory);
    let mut session = build_with(
        factory,
        constraints,
        SessionConfig::default().with_environment_mode(EnvironmentMode::FastAssert),
    );

    let mut live: Vec<(FactHandle, Value)> = Vec::new();
    let mut next_id = 0;
    for _ in 0..100 {
        match rng.random_range(0..6) {
            0 if !live.is_empty() => {
                let (handle, _) = live.swap_remove(rng.random_range(0..live.len()));
                session.retract(handle).unwrap();
            }
            1 | 2 => {
                let lesson = random_lesson(&mut rng, next_id);
                next_id += 1;
                live.push((session.insert(lesson.clone()).unwrap(), lesson));
            }
            _ if !live.is_empty() => {
                let at = rng.random_range(0..live.len());
                let (id, _, _, _) = timetable::lesson_parts(&live[at].1);
                let lesson = random_lesson(&mut rng, id);
                session.update(live[at].0, lesson.clone()).unwrap();
                live[at].1 = lesson;
            }
            _ => {}
        }
        assert_eq!(
            session.settle().unwrap(),
            timetable_score(&live_values(&live))
        );
    }
}

#[test]
fn test_revert_restores_exact_state() {
    let mut factory = ConstraintFactory::new();
    let constraints = timetable_constraints(&mut factory);
    let mut session = build_with(
        factory,
        constraints,
        SessionConfig::default().with_constraint_match_policy(ConstraintMatchPolicy::Enabled),
    );

    let first = timetable::assigned_lesson(0, 0, 0, 0);
    let a = session.insert(first.clone()).unwrap();
    session.insert(timetable::assigned_lesson(1, 0, 1, 0)).unwrap();
    session.insert(timetable::lesson(2, 1, None, Some(0))).unwrap();
    let score = session.settle().unwrap();
    assert_eq!(score, HardSoftScore::of(-1, -1));
    let statistics = session.statistics();
    let totals = session.constraint_totals().unwrap().to_vec();

    session
        .update(a, timetable::assigned_lesson(0, 1, 1, 0))
        .unwrap();
    let extra = session.insert(timetable::assigned_lesson(3, 1, 1, 0)).unwrap();
    assert_ne!(session.settle().unwrap(), score);

    session.update(a, first).unwrap();
    session.retract(extra).unwrap();
    assert_eq!(session.settle().unwrap(), score);
    assert_eq!(session.statistics(), statistics);
    assert_eq!(session.constraint_totals().unwrap(), totals.as_slice());
}

#[test]
fn test_insert_then_retract_before_settle_leaves_nothing() {
    let mut factory = ConstraintFactory::new();
    let constraints = nqueens_constraints(&mut factory);
    let mut session = build(factory, constraints);
    session.insert(nqueens::queen(0, 0, 0)).unwrap();
    session.settle().unwrap();
    let statistics = session.statistics();

    let transient = session.insert(nqueens::queen(1, 1, 0)).unwrap();
    session.update(transient, nqueens::queen(1, 1, 1)).unwrap();
    session.retract(transient).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(0));
    assert_eq!(session.statistics(), statistics);
}

#[test]
fn test_insertion_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut lessons: Vec<Value> = (0..24).map(|id| random_lesson(&mut rng, id)).collect();

    let mut sessions = Vec::new();
    for _ in 0..3 {
        let mut factory = ConstraintFactory::new();
        let constraints = timetable_constraints(&mut factory);
        let mut session = build_with(
            factory,
            constraints,
            SessionConfig::default().with_constraint_match_policy(ConstraintMatchPolicy::Enabled),
        );
        lessons.shuffle(&mut rng);
        for lesson in &lessons {
            session.insert(lesson.clone()).unwrap();
        }
        session.settle().unwrap();
        sessions.push(session);
    }

    let expected = timetable_score(&lessons);
    for session in &sessions {
        assert_eq!(session.score().unwrap(), expected);
        assert_eq!(session.statistics(), sessions[0].statistics());
        assert_eq!(
            session.constraint_totals().unwrap(),
            sessions[0].constraint_totals().unwrap()
        );
    }
}

#[test]
fn test_batching_does_not_matter() {
    let rows = [3, 1, 1, 0, 2, 3];
    let queens = nqueens::queens_with_rows(&rows);

    let mut factory = ConstraintFactory::new();
    let constraints = nqueens_constraints(&mut factory);
    let mut one_by_one = build(factory, constraints);
    for queen in &queens {
        one_by_one.insert(queen.clone()).unwrap();
        one_by_one.settle().unwrap();
    }

    let mut factory = ConstraintFactory::new();
    let constraints = nqueens_constraints(&mut factory);
    let mut at_once = build(factory, constraints);
    for queen in &queens {
        at_once.insert(queen.clone()).unwrap();
    }
    at_once.settle().unwrap();

    let expected = SimpleScore::of(nqueens::calculate_conflicts(&queens));
    assert_eq!(one_by_one.score().unwrap(), expected);
    assert_eq!(at_once.score().unwrap(), expected);
    assert_eq!(one_by_one.statistics(), at_once.statistics());
}

#[test]
fn test_every_edge_climbs_a_layer() {
    let mut factory = ConstraintFactory::new();
    let constraints = timetable_constraints(&mut factory);
    let session = build(factory, constraints);
    let statistics = session.statistics();

    for (parent, child) in session.edges() {
        assert!(statistics.nodes[parent].layer < statistics.nodes[child].layer);
    }
    for node in &statistics.nodes {
        let is_source = node.kind == "source";
        assert_eq!(node.layer == 0, is_source, "{:?}", node);
    }
    let deepest = statistics.nodes.iter().map(|n| n.layer).max().unwrap();
    assert_eq!(statistics.layers, deepest + 1);
}
