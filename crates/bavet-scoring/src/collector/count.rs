//! Count collector.

use std::marker::PhantomData;
use std::sync::Arc;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector counting the tuples of each group.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{count, Collector};
/// use bavet_test::Value;
///
/// let collector = count::<Value>();
/// let mut acc = collector.supply();
///
/// let first = acc.accumulate(&[Value::Int(1)]);
/// acc.accumulate(&[Value::Int(2)]);
/// assert_eq!(acc.result(), Some(Value::Int(2)));
///
/// acc.undo(first);
/// assert_eq!(acc.result(), Some(Value::Int(1)));
/// ```
pub fn count<F>() -> SharedCollector<F>
where
    F: From<i64> + Send + Sync + 'static,
{
    Arc::new(CountCollector {
        _phantom: PhantomData,
    })
}

struct CountCollector<F> {
    _phantom: PhantomData<fn() -> F>,
}

impl<F> Collector<F> for CountCollector<F>
where
    F: From<i64> + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(CountAccumulator { count: 0 })
    }
}

struct CountAccumulator {
    count: i64,
}

impl<F: From<i64>> Accumulator<F> for CountAccumulator {
    #[inline]
    fn accumulate(&mut self, _tuple: &[F]) -> Undo<F> {
        self.count += 1;
        Undo::Decrement
    }

    #[inline]
    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(matches!(undo, Undo::Decrement));
        self.count -= 1;
    }

    fn result(&self) -> Option<F> {
        Some(F::from(self.count))
    }
}
