//! The value type that flows through a scoring network.

use std::fmt::Debug;
use std::hash::Hash;

/// A value stored in tuples: either an inserted problem fact or a value
/// derived by the network (a group key, a collector result, a mapped value).
///
/// Facts are compared and hashed by value because group-by and distinct
/// nodes partition tuples by their facts. Identity of inserted facts is
/// carried separately by the session's fact handles, so a fact may change
/// value between insert and retract.
///
/// Implementors are usually an enum over the domain types, cheap to clone
/// (wrap large payloads in `Arc`).
///
/// # Example
///
/// ```
/// use bavet_core::Fact;
///
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// enum Value {
///     Lesson { id: u32, room: Option<u32> },
///     Int(i64),
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Class { Lesson, Derived }
///
/// impl Fact for Value {
///     type Class = Class;
///
///     fn class(&self) -> Class {
///         match self {
///             Value::Lesson { .. } => Class::Lesson,
///             Value::Int(_) => Class::Derived,
///         }
///     }
///
///     fn is_assigned(&self) -> bool {
///         !matches!(self, Value::Lesson { room: None, .. })
///     }
/// }
///
/// let unassigned = Value::Lesson { id: 1, room: None };
/// assert_eq!(unassigned.class(), Class::Lesson);
/// assert!(!unassigned.is_assigned());
/// ```
pub trait Fact: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Discriminates which source nodes receive an inserted fact.
    type Class: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the class used to route this fact to its source nodes.
    fn class(&self) -> Self::Class;

    /// Returns false while a planning variable of this fact is unassigned.
    ///
    /// Plain `for_each` sources skip unassigned facts; the
    /// `for_each_including_unassigned` variant sees every fact.
    fn is_assigned(&self) -> bool {
        true
    }
}
