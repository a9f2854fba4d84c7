//! The distinct count, join and group emptying scenarios.

use bavet_core::{ConstraintRef, SimpleScore};
use bavet_test::{timetable, Class, Value};

use super::{build, first, lesson_room, lesson_teacher, room_id};
use crate::collector::{count, count_distinct};
use crate::stream::{joiner, key, ConstraintDef, ConstraintFactory};

fn group_node_buckets(session: &super::Session<Value, SimpleScore>) -> usize {
    session
        .statistics()
        .nodes
        .iter()
        .find(|n| n.kind == "group_by")
        .map(|n| n.buckets)
        .unwrap()
}

#[test]
fn test_distinct_count_keeps_value_until_last_reference_leaves() {
    let mut factory = ConstraintFactory::new();
    let words = factory.for_each(Class::Derived);
    let distinct = factory
        .group_by(words, vec![], vec![count_distinct(first)])
        .unwrap();
    let constraints = vec![ConstraintDef::reward(
        ConstraintRef::new("", "Distinct words"),
        distinct,
        SimpleScore::ONE,
    )
    .with_match_weight(|t: &[Value]| t[0].as_int().unwrap_or(0))];
    let mut session = build(factory, constraints);

    let x1 = session.insert(Value::text("x")).unwrap();
    let x2 = session.insert(Value::text("x")).unwrap();
    session.insert(Value::text("y")).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(2));

    session.retract(x1).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(2));

    session.retract(x2).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(1));
}

#[test]
fn test_join_match_follows_its_inputs() {
    let mut factory = ConstraintFactory::new();
    let rooms = factory.for_each(Class::Room);
    let lessons = factory.for_each(Class::Lesson);
    let booked = factory
        .join(rooms, lessons, vec![joiner::equal_bi(room_id, lesson_room)])
        .unwrap();
    let constraints = vec![ConstraintDef::penalize(
        ConstraintRef::new("", "Booked room"),
        booked,
        SimpleScore::ONE,
    )];
    let mut session = build(factory, constraints);

    let a = session.insert(timetable::room(1, 30)).unwrap();
    session
        .insert(timetable::assigned_lesson(0, 0, 1, 0))
        .unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-1));
    let joined = session.statistics().tuples;

    let room = session.retract(a).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(0));
    // The room tuple and the joined tuple are both gone.
    assert_eq!(session.statistics().tuples, joined - 2);
    assert_eq!(session.constraint_totals().unwrap()[0].match_count, 0);

    session.insert(room).unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-1));
    assert_eq!(session.statistics().tuples, joined);
}

#[test]
fn test_emptied_group_retracts_its_tuple() {
    let mut factory = ConstraintFactory::new();
    let lessons = factory.for_each(Class::Lesson);
    let per_teacher = factory
        .group_by(lessons, vec![key(lesson_teacher)], vec![count()])
        .unwrap();
    let constraints = vec![ConstraintDef::penalize(
        ConstraintRef::new("", "Teacher load"),
        per_teacher,
        SimpleScore::ONE,
    )
    .with_match_weight(|t: &[Value]| t[1].as_int().unwrap_or(0))];
    let mut session = build(factory, constraints);

    let handles: Vec<_> = (0..3)
        .map(|id| {
            session
                .insert(timetable::assigned_lesson(id, 7, 0, id))
                .unwrap()
        })
        .collect();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-3));
    assert_eq!(group_node_buckets(&session), 1);
    assert_eq!(session.constraint_totals().unwrap()[0].match_count, 1);

    for handle in handles {
        session.retract(handle).unwrap();
    }
    assert_eq!(session.settle().unwrap(), SimpleScore::of(0));
    assert_eq!(group_node_buckets(&session), 0);
    assert_eq!(session.constraint_totals().unwrap()[0].match_count, 0);
    assert_eq!(session.statistics().tuples, 0);
}

#[test]
fn test_group_member_moving_between_keys() {
    let mut factory = ConstraintFactory::new();
    let lessons = factory.for_each(Class::Lesson);
    let per_teacher = factory
        .group_by(lessons, vec![key(lesson_teacher)], vec![count()])
        .unwrap();
    let constraints = vec![ConstraintDef::penalize(
        ConstraintRef::new("", "Teacher load squared"),
        per_teacher,
        SimpleScore::ONE,
    )
    .with_match_weight(|t: &[Value]| {
        let n = t[1].as_int().unwrap_or(0);
        n * n
    })];
    let mut session = build(factory, constraints);

    session
        .insert(timetable::assigned_lesson(0, 1, 0, 0))
        .unwrap();
    let moving = session
        .insert(timetable::assigned_lesson(1, 1, 0, 1))
        .unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-4));

    session
        .update(moving, timetable::assigned_lesson(1, 2, 0, 1))
        .unwrap();
    assert_eq!(session.settle().unwrap(), SimpleScore::of(-2));
    assert_eq!(group_node_buckets(&session), 2);
}
