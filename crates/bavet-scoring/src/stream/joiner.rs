//! Joiners for join and exists streams.
//!
//! Equal joiners are indexed: both sides are partitioned by the extracted key
//! and only tuples with equal keys are ever paired. Every other joiner is a
//! residual filter evaluated per candidate pair, in declared order.
//!
//! # Self-joins
//!
//! Use [`equal()`] with a single extractor when both sides share a shape:
//!
//! ```
//! use bavet_scoring::stream::joiner::equal;
//! use bavet_test::Value;
//!
//! let same_row = equal(|t: &[Value]| t[0].clone());
//! assert!(same_row.matches(&[Value::Int(1)], &[Value::Int(1)]));
//! assert!(!same_row.matches(&[Value::Int(1)], &[Value::Int(2)]));
//! ```

use std::sync::Arc;

use super::{KeyFn, PairPredicate};

/// A condition between the left and the right tuple of a join.
#[derive(Clone)]
pub enum Joiner<F> {
    /// Indexed: left and right keys must be equal.
    Equal { left: KeyFn<F>, right: KeyFn<F> },
    /// Residual predicate over the candidate pair.
    Filtering(PairPredicate<F>),
}

impl<F: PartialEq> Joiner<F> {
    /// Returns true if the pair satisfies this joiner.
    pub fn matches(&self, left: &[F], right: &[F]) -> bool {
        match self {
            Joiner::Equal {
                left: left_key,
                right: right_key,
            } => left_key(left) == right_key(right),
            Joiner::Filtering(predicate) => predicate(left, right),
        }
    }
}

impl<F> Joiner<F> {
    /// Returns true for joiners served by the index.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Joiner::Equal { .. })
    }
}

impl<F> std::fmt::Debug for Joiner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Joiner::Equal { .. } => f.write_str("Joiner::Equal"),
            Joiner::Filtering(_) => f.write_str("Joiner::Filtering"),
        }
    }
}

/// Joins tuples whose extracted keys are equal, using one extractor for both sides.
pub fn equal<F, K>(key: K) -> Joiner<F>
where
    K: Fn(&[F]) -> F + Send + Sync + 'static,
{
    let key: KeyFn<F> = Arc::new(key);
    Joiner::Equal {
        left: Arc::clone(&key),
        right: key,
    }
}

/// Joins tuples whose extracted keys are equal, with one extractor per side.
///
/// ```
/// use bavet_scoring::stream::joiner::equal_bi;
/// use bavet_test::Value;
///
/// // lesson.room == room.id
/// let in_room = equal_bi(
///     |t: &[Value]| match &t[0] {
///         Value::Lesson { room: Some(r), .. } => Value::Int(*r as i64),
///         _ => Value::Int(-1),
///     },
///     |t: &[Value]| match &t[0] {
///         Value::Room { id, .. } => Value::Int(*id as i64),
///         _ => Value::Int(-2),
///     },
/// );
/// assert!(in_room.is_indexed());
/// ```
pub fn equal_bi<F, L, R>(left: L, right: R) -> Joiner<F>
where
    L: Fn(&[F]) -> F + Send + Sync + 'static,
    R: Fn(&[F]) -> F + Send + Sync + 'static,
{
    Joiner::Equal {
        left: Arc::new(left),
        right: Arc::new(right),
    }
}

fn comparison<F, T, L, R>(left: L, right: R, accept: fn(&T, &T) -> bool) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    L: Fn(&[F]) -> T + Send + Sync + 'static,
    R: Fn(&[F]) -> T + Send + Sync + 'static,
{
    Joiner::Filtering(Arc::new(move |l: &[F], r: &[F]| {
        accept(&left(l), &right(r))
    }))
}

/// Pairs where the left value is strictly less than the right value.
///
/// ```
/// use bavet_scoring::stream::joiner::less_than;
/// use bavet_test::Value;
///
/// let earlier = less_than(|t: &[Value]| t[0].as_int(), |t: &[Value]| t[0].as_int());
/// assert!(earlier.matches(&[Value::Int(1)], &[Value::Int(2)]));
/// assert!(!earlier.matches(&[Value::Int(2)], &[Value::Int(2)]));
/// ```
pub fn less_than<F, T, L, R>(left: L, right: R) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    L: Fn(&[F]) -> T + Send + Sync + 'static,
    R: Fn(&[F]) -> T + Send + Sync + 'static,
{
    comparison(left, right, |l, r| l < r)
}

/// Pairs where the left value is less than or equal to the right value.
pub fn less_than_or_equal<F, T, L, R>(left: L, right: R) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    L: Fn(&[F]) -> T + Send + Sync + 'static,
    R: Fn(&[F]) -> T + Send + Sync + 'static,
{
    comparison(left, right, |l, r| l <= r)
}

/// Pairs where the left value is strictly greater than the right value.
pub fn greater_than<F, T, L, R>(left: L, right: R) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    L: Fn(&[F]) -> T + Send + Sync + 'static,
    R: Fn(&[F]) -> T + Send + Sync + 'static,
{
    comparison(left, right, |l, r| l > r)
}

/// Pairs where the left value is greater than or equal to the right value.
pub fn greater_than_or_equal<F, T, L, R>(left: L, right: R) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    L: Fn(&[F]) -> T + Send + Sync + 'static,
    R: Fn(&[F]) -> T + Send + Sync + 'static,
{
    comparison(left, right, |l, r| l >= r)
}

/// Pairs whose half-open ranges `[start, end)` intersect.
///
/// ```
/// use bavet_scoring::stream::joiner::overlapping;
/// use bavet_test::Value;
///
/// // (start, end) tuples
/// let start = |t: &[Value]| t[0].as_int();
/// let end = |t: &[Value]| t[1].as_int();
/// let overlaps = overlapping(start, end, start, end);
///
/// let morning = [Value::Int(8), Value::Int(12)];
/// let noon = [Value::Int(11), Value::Int(14)];
/// let evening = [Value::Int(12), Value::Int(18)];
/// assert!(overlaps.matches(&morning, &noon));
/// assert!(!overlaps.matches(&morning, &evening));
/// ```
pub fn overlapping<F, T, LS, LE, RS, RE>(
    left_start: LS,
    left_end: LE,
    right_start: RS,
    right_end: RE,
) -> Joiner<F>
where
    F: 'static,
    T: Ord + 'static,
    LS: Fn(&[F]) -> T + Send + Sync + 'static,
    LE: Fn(&[F]) -> T + Send + Sync + 'static,
    RS: Fn(&[F]) -> T + Send + Sync + 'static,
    RE: Fn(&[F]) -> T + Send + Sync + 'static,
{
    Joiner::Filtering(Arc::new(move |l: &[F], r: &[F]| {
        left_start(l) < right_end(r) && right_start(r) < left_end(l)
    }))
}

/// Pairs accepted by an arbitrary predicate.
pub fn filtering<F, P>(predicate: P) -> Joiner<F>
where
    P: Fn(&[F], &[F]) -> bool + Send + Sync + 'static,
{
    Joiner::Filtering(Arc::new(predicate))
}
