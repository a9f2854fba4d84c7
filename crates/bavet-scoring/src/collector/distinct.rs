//! Count-distinct collector.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector counting distinct mapped values.
///
/// Each value is reference counted, so it only stops counting once every
/// tuple that produced it has been retracted.
pub fn count_distinct<F, M>(mapper: M) -> SharedCollector<F>
where
    F: Clone + Eq + Hash + From<i64> + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
{
    Arc::new(CountDistinctCollector {
        mapper: Arc::new(mapper),
    })
}

struct CountDistinctCollector<M> {
    mapper: Arc<M>,
}

impl<F, M> Collector<F> for CountDistinctCollector<M>
where
    F: Clone + Eq + Hash + From<i64> + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(CountDistinctAccumulator {
            mapper: Arc::clone(&self.mapper),
            counts: HashMap::new(),
        })
    }
}

struct CountDistinctAccumulator<F, M> {
    mapper: Arc<M>,
    counts: HashMap<F, usize>,
}

impl<F, M> Accumulator<F> for CountDistinctAccumulator<F, M>
where
    F: Clone + Eq + Hash + From<i64> + Send,
    M: Fn(&[F]) -> F + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        let value = (self.mapper)(tuple);
        *self.counts.entry(value.clone()).or_insert(0) += 1;
        Undo::Release(value)
    }

    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(matches!(undo, Undo::Release(_)), "count_distinct expects a release");
        let Undo::Release(value) = undo else {
            return;
        };
        debug_assert!(
            self.counts.contains_key(&value),
            "count_distinct released a value it never counted"
        );
        if let Some(count) = self.counts.get_mut(&value) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&value);
            }
        }
    }

    fn result(&self) -> Option<F> {
        Some(F::from(self.counts.len() as i64))
    }
}
