//! Min and max collectors.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector keeping the mapped value with the smallest sort key.
///
/// Values are reference counted; ties on the sort key resolve to the value
/// that reached the accumulator first. The result is `None` for an empty
/// accumulator.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{min, Collector};
/// use bavet_test::Value;
///
/// let collector = min(|t: &[Value]| t[0].clone(), |v: &Value| v.as_int());
/// let mut acc = collector.supply();
///
/// let three = acc.accumulate(&[Value::Int(3)]);
/// acc.accumulate(&[Value::Int(7)]);
/// assert_eq!(acc.result(), Some(Value::Int(3)));
///
/// acc.undo(three);
/// assert_eq!(acc.result(), Some(Value::Int(7)));
/// ```
pub fn min<F, M, S, K>(mapper: M, sort_key: S) -> SharedCollector<F>
where
    F: Clone + Eq + Hash + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
    S: Fn(&F) -> K + Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
{
    Arc::new(ExtremumCollector {
        mapper: Arc::new(mapper),
        sort_key: Arc::new(sort_key),
        largest: false,
    })
}

/// Creates a collector keeping the mapped value with the largest sort key.
///
/// See [`min`].
pub fn max<F, M, S, K>(mapper: M, sort_key: S) -> SharedCollector<F>
where
    F: Clone + Eq + Hash + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
    S: Fn(&F) -> K + Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
{
    Arc::new(ExtremumCollector {
        mapper: Arc::new(mapper),
        sort_key: Arc::new(sort_key),
        largest: true,
    })
}

struct ExtremumCollector<M, S> {
    mapper: Arc<M>,
    sort_key: Arc<S>,
    largest: bool,
}

impl<F, M, S, K> Collector<F> for ExtremumCollector<M, S>
where
    F: Clone + Eq + Hash + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
    S: Fn(&F) -> K + Send + Sync + 'static,
    K: Ord + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(ExtremumAccumulator {
            mapper: Arc::clone(&self.mapper),
            sort_key: Arc::clone(&self.sort_key),
            largest: self.largest,
            values: BTreeMap::new(),
        })
    }
}

struct ExtremumAccumulator<F, K, M, S> {
    mapper: Arc<M>,
    sort_key: Arc<S>,
    largest: bool,
    // Sort key -> values sharing it, with reference counts.
    values: BTreeMap<K, IndexMap<F, usize>>,
}

impl<F, K, M, S> Accumulator<F> for ExtremumAccumulator<F, K, M, S>
where
    F: Clone + Eq + Hash + Send,
    K: Ord + Send,
    M: Fn(&[F]) -> F + Send + Sync,
    S: Fn(&F) -> K + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        let value = (self.mapper)(tuple);
        let key = (self.sort_key)(&value);
        *self
            .values
            .entry(key)
            .or_default()
            .entry(value.clone())
            .or_insert(0) += 1;
        Undo::Release(value)
    }

    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(matches!(undo, Undo::Release(_)), "min/max expects a release");
        let Undo::Release(value) = undo else {
            return;
        };
        let key = (self.sort_key)(&value);
        debug_assert!(
            self.values
                .get(&key)
                .is_some_and(|bucket| bucket.contains_key(&value)),
            "min/max released a value it never saw"
        );
        let Some(bucket) = self.values.get_mut(&key) else {
            return;
        };
        if let Some(count) = bucket.get_mut(&value) {
            *count -= 1;
            if *count == 0 {
                bucket.shift_remove(&value);
            }
        }
        if bucket.is_empty() {
            self.values.remove(&key);
        }
    }

    fn result(&self) -> Option<F> {
        let bucket = if self.largest {
            self.values.values().next_back()
        } else {
            self.values.values().next()
        }?;
        bucket.keys().next().cloned()
    }
}
