//! Session tests: concrete scenarios, incremental properties, build rules
//! and score analysis.

mod analysis;
mod incremental;
mod scenarios;

use bavet_config::SessionConfig;
use bavet_core::{ConstraintRef, Fact, HardSoftScore, ParseableScore, SimpleScore};
use bavet_test::{nqueens, timetable, Class, Value};

use super::{FactHandle, Session, SessionFactory};
use crate::api::weight_overrides::ConstraintWeightOverrides;
use crate::stream::{joiner, ConstraintDef, ConstraintFactory};

pub(super) fn build_with<Sc: ParseableScore>(
    factory: ConstraintFactory<Value>,
    constraints: Vec<ConstraintDef<Value, Sc>>,
    config: SessionConfig,
) -> Session<Value, Sc> {
    bavet_test::init_test_logging();
    SessionFactory::new(factory, constraints, config)
        .unwrap()
        .build_session(&ConstraintWeightOverrides::new())
        .unwrap()
}

pub(super) fn build<Sc: ParseableScore>(
    factory: ConstraintFactory<Value>,
    constraints: Vec<ConstraintDef<Value, Sc>>,
) -> Session<Value, Sc> {
    build_with(factory, constraints, SessionConfig::default())
}

pub(super) fn first(t: &[Value]) -> Value {
    t[0].clone()
}

pub(super) fn queen_id(t: &[Value]) -> i64 {
    nqueens::queen_parts(&t[0]).0
}

pub(super) fn queen_row(t: &[Value]) -> Value {
    Value::Int(nqueens::queen_parts(&t[0]).2.unwrap_or(-1))
}

pub(super) fn lesson_id(t: &[Value]) -> u32 {
    timetable::lesson_parts(&t[0]).0
}

pub(super) fn lesson_teacher(t: &[Value]) -> Value {
    Value::Int(timetable::lesson_parts(&t[0]).1 as i64)
}

pub(super) fn lesson_room(t: &[Value]) -> Value {
    Value::Int(timetable::lesson_parts(&t[0]).2.map_or(-1, i64::from))
}

pub(super) fn lesson_timeslot(t: &[Value]) -> Value {
    Value::Int(timetable::lesson_parts(&t[0]).3.map_or(-1, i64::from))
}

pub(super) fn room_id(t: &[Value]) -> Value {
    match &t[0] {
        Value::Room { id, .. } => Value::Int(i64::from(*id)),
        other => panic!("expected a room, got {:?}", other),
    }
}

/// Row and diagonal conflicts between pairs of assigned queens.
pub(super) fn nqueens_constraints(
    factory: &mut ConstraintFactory<Value>,
) -> Vec<ConstraintDef<Value, SimpleScore>> {
    let queens = factory.for_each(Class::Queen);
    let same_row = factory
        .join(
            queens,
            queens,
            vec![
                joiner::equal(queen_row),
                joiner::less_than(queen_id, queen_id),
            ],
        )
        .unwrap();
    let same_diagonal = factory
        .join(
            queens,
            queens,
            vec![
                joiner::less_than(queen_id, queen_id),
                joiner::filtering(|a: &[Value], b: &[Value]| {
                    let (_, column_a, row_a) = nqueens::queen_parts(&a[0]);
                    let (_, column_b, row_b) = nqueens::queen_parts(&b[0]);
                    match (row_a, row_b) {
                        (Some(row_a), Some(row_b)) => {
                            (row_a - row_b).abs() == (column_a - column_b).abs()
                        }
                        _ => false,
                    }
                }),
            ],
        )
        .unwrap();
    vec![
        ConstraintDef::penalize(
            ConstraintRef::new("nqueens", "Row conflict"),
            same_row,
            SimpleScore::of(1),
        ),
        ConstraintDef::penalize(
            ConstraintRef::new("nqueens", "Diagonal conflict"),
            same_diagonal,
            SimpleScore::of(1),
        ),
    ]
}

/// Room and teacher conflicts (hard) and unassigned lessons (soft).
pub(super) fn timetable_constraints(
    factory: &mut ConstraintFactory<Value>,
) -> Vec<ConstraintDef<Value, HardSoftScore>> {
    let lessons = factory.for_each(Class::Lesson);
    let every_lesson = factory.for_each_including_unassigned(Class::Lesson);
    let room_conflict = factory
        .join(
            lessons,
            lessons,
            vec![
                joiner::equal(lesson_room),
                joiner::equal(lesson_timeslot),
                joiner::less_than(lesson_id, lesson_id),
            ],
        )
        .unwrap();
    let teacher_conflict = factory
        .join(
            lessons,
            lessons,
            vec![
                joiner::equal(lesson_teacher),
                joiner::equal(lesson_timeslot),
                joiner::less_than(lesson_id, lesson_id),
            ],
        )
        .unwrap();
    let unassigned = factory
        .filter(every_lesson, |t: &[Value]| !t[0].is_assigned())
        .unwrap();
    vec![
        ConstraintDef::penalize(
            ConstraintRef::new("timetable", "Room conflict"),
            room_conflict,
            HardSoftScore::ONE_HARD,
        ),
        ConstraintDef::penalize(
            ConstraintRef::new("timetable", "Teacher conflict"),
            teacher_conflict,
            HardSoftScore::ONE_HARD,
        ),
        ConstraintDef::penalize(
            ConstraintRef::new("timetable", "Unassigned lesson"),
            unassigned,
            HardSoftScore::ONE_SOFT,
        ),
    ]
}

/// The score the timetable constraints must reach for `lessons`.
pub(super) fn timetable_score(lessons: &[Value]) -> HardSoftScore {
    let hard = timetable::count_room_conflicts(lessons) + timetable::count_teacher_conflicts(lessons);
    HardSoftScore::of(-hard, -timetable::count_unassigned(lessons))
}
