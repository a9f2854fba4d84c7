//! School timetabling fixtures.
//!
//! Lessons are assigned a room and a timeslot. A room conflict is two lessons
//! in the same room at the same timeslot; a teacher conflict is one teacher
//! giving two lessons at the same timeslot.

use crate::value::Value;

/// Creates a lesson, possibly unassigned.
pub fn lesson(id: u32, teacher: u32, room: Option<u32>, timeslot: Option<u32>) -> Value {
    Value::Lesson {
        id,
        teacher,
        room,
        timeslot,
    }
}

/// Creates a fully assigned lesson.
pub fn assigned_lesson(id: u32, teacher: u32, room: u32, timeslot: u32) -> Value {
    lesson(id, teacher, Some(room), Some(timeslot))
}

/// Creates a room.
pub fn room(id: u32, capacity: i64) -> Value {
    Value::Room { id, capacity }
}

/// Returns `(id, teacher, room, timeslot)` of a lesson value.
///
/// # Panics
///
/// Panics if `value` is not a lesson.
pub fn lesson_parts(value: &Value) -> (u32, u32, Option<u32>, Option<u32>) {
    match value {
        Value::Lesson {
            id,
            teacher,
            room,
            timeslot,
        } => (*id, *teacher, *room, *timeslot),
        other => panic!("expected a lesson, got {:?}", other),
    }
}

/// Counts pairs of assigned lessons sharing a room and a timeslot.
pub fn count_room_conflicts(lessons: &[Value]) -> i64 {
    count_pairs(lessons, |a, b| {
        let (_, _, room_a, slot_a) = lesson_parts(a);
        let (_, _, room_b, slot_b) = lesson_parts(b);
        room_a.is_some() && slot_a.is_some() && room_a == room_b && slot_a == slot_b
    })
}

/// Counts pairs of assigned lessons given by one teacher at one timeslot.
pub fn count_teacher_conflicts(lessons: &[Value]) -> i64 {
    count_pairs(lessons, |a, b| {
        let (_, teacher_a, room_a, slot_a) = lesson_parts(a);
        let (_, teacher_b, room_b, slot_b) = lesson_parts(b);
        room_a.is_some()
            && room_b.is_some()
            && slot_a.is_some()
            && teacher_a == teacher_b
            && slot_a == slot_b
    })
}

/// Counts lessons with no room or no timeslot.
pub fn count_unassigned(lessons: &[Value]) -> i64 {
    lessons.iter().filter(|l| !bavet_core::Fact::is_assigned(*l)).count() as i64
}

fn count_pairs(lessons: &[Value], conflict: impl Fn(&Value, &Value) -> bool) -> i64 {
    let mut count = 0;
    for i in 0..lessons.len() {
        for j in (i + 1)..lessons.len() {
            if conflict(&lessons[i], &lessons[j]) {
                count += 1;
            }
        }
    }
    count
}
