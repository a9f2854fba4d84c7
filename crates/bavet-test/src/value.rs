//! The fact type used across engine tests.

use bavet_core::Fact;

/// Every value that can appear in a test tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// A queen on column `column`, with its row as the planning variable.
    Queen { id: i64, column: i64, row: Option<i64> },
    /// A lesson taught by `teacher`, assigned to a room and a timeslot.
    Lesson {
        id: u32,
        teacher: u32,
        room: Option<u32>,
        timeslot: Option<u32>,
    },
    /// A room with its seat capacity.
    Room { id: u32, capacity: i64 },
    /// A plain integer, used for keys, mapped values and collector results.
    Int(i64),
    /// A plain string.
    Text(String),
    /// A collected list.
    List(Vec<Value>),
}

/// Fact classes routed to source nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    Queen,
    Lesson,
    Room,
    Derived,
}

impl Fact for Value {
    type Class = Class;

    fn class(&self) -> Class {
        match self {
            Value::Queen { .. } => Class::Queen,
            Value::Lesson { .. } => Class::Lesson,
            Value::Room { .. } => Class::Room,
            Value::Int(_) | Value::Text(_) | Value::List(_) => Class::Derived,
        }
    }

    fn is_assigned(&self) -> bool {
        match self {
            Value::Queen { row, .. } => row.is_some(),
            Value::Lesson { room, timeslot, .. } => room.is_some() && timeslot.is_some(),
            _ => true,
        }
    }
}

impl Value {
    /// Shorthand for [`Value::Text`].
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Returns the integer payload, if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the list payload, if this is a [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
