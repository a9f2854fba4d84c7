//! Incremental collectors for group-by nodes.
//!
//! A [`Collector`] supplies one [`Accumulator`] per group. Every
//! [`Accumulator::accumulate`] call returns an [`Undo`] token describing how
//! to reverse exactly that insertion; the group node stores the token in the
//! tuple's slot and hands it back on retract. Reference counts for values
//! that recur (distinct sets, min/max) live inside the accumulator, so undoing
//! one of two equal insertions leaves the other in place.
//!
//! # Example
//!
//! ```
//! use bavet_scoring::collector::{count_distinct, Collector};
//! use bavet_test::Value;
//!
//! let collector = count_distinct(|t: &[Value]| t[0].clone());
//! let mut acc = collector.supply();
//!
//! let x1 = acc.accumulate(&[Value::text("x")]);
//! let x2 = acc.accumulate(&[Value::text("x")]);
//! let _y = acc.accumulate(&[Value::text("y")]);
//! assert_eq!(acc.result(), Some(Value::Int(2)));
//!
//! acc.undo(x1);
//! assert_eq!(acc.result(), Some(Value::Int(2)));
//! acc.undo(x2);
//! assert_eq!(acc.result(), Some(Value::Int(1)));
//! ```

mod compose;
mod count;
mod distinct;
mod list;
mod load_balance;
mod min_max;
mod sum;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use compose::{compose, conditionally, custom};
pub use count::count;
pub use distinct::count_distinct;
pub use list::to_list;
pub use load_balance::{load_balance, LoadBalanceAccumulator};
pub use min_max::{max, min};
pub use sum::sum;

/// Reverses one accumulation.
///
/// Undo is a plain value rather than a closure: tokens are stored in tuple
/// slots without boxing, and one generic [`Accumulator::undo`] applies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo<F> {
    /// The insertion had no effect.
    Nothing,
    /// Decrement a counter.
    Decrement,
    /// Subtract an amount from a running total.
    Subtract(i64),
    /// Release one reference to a value.
    Release(F),
    /// Release one reference to a key together with the metric it carried.
    ReleaseWeighted(F, i64),
    /// Remove the entry with this sequence number.
    Entry(u64),
    /// One token per part of a composed collector, positionally.
    Composite(Vec<Undo<F>>),
}

/// Mutable aggregate of one group.
pub trait Accumulator<F>: Send {
    /// Adds the facts of one tuple and returns the token that reverses it.
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F>;

    /// Applies a token previously returned by [`accumulate`](Self::accumulate)
    /// on this same accumulator.
    fn undo(&mut self, undo: Undo<F>);

    /// The current aggregate, or `None` when it is undefined (min of nothing).
    fn result(&self) -> Option<F>;
}

/// Factory of accumulators; one accumulator is supplied per group.
pub trait Collector<F>: Send + Sync {
    /// Creates an empty accumulator.
    fn supply(&self) -> Box<dyn Accumulator<F>>;
}

/// A collector shared between stream definitions and built nodes.
///
/// Pointer identity of the `Arc` is part of a stream's identity when
/// identical sub-streams are shared between constraints.
pub type SharedCollector<F> = Arc<dyn Collector<F>>;
