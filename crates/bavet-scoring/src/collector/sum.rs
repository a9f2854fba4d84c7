//! Sum collector.

use std::sync::Arc;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector summing an integer mapped from each tuple.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{sum, Collector};
/// use bavet_test::Value;
///
/// let collector = sum(|t: &[Value]| t[0].as_int().unwrap_or(0));
/// let mut acc = collector.supply();
///
/// acc.accumulate(&[Value::Int(5)]);
/// let three = acc.accumulate(&[Value::Int(3)]);
/// assert_eq!(acc.result(), Some(Value::Int(8)));
///
/// acc.undo(three);
/// assert_eq!(acc.result(), Some(Value::Int(5)));
/// ```
pub fn sum<F, M>(mapper: M) -> SharedCollector<F>
where
    F: From<i64> + Send + Sync + 'static,
    M: Fn(&[F]) -> i64 + Send + Sync + 'static,
{
    Arc::new(SumCollector {
        mapper: Arc::new(mapper),
    })
}

struct SumCollector<M> {
    mapper: Arc<M>,
}

impl<F, M> Collector<F> for SumCollector<M>
where
    F: From<i64> + Send + Sync + 'static,
    M: Fn(&[F]) -> i64 + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(SumAccumulator {
            mapper: Arc::clone(&self.mapper),
            total: 0,
        })
    }
}

struct SumAccumulator<M> {
    mapper: Arc<M>,
    total: i64,
}

impl<F, M> Accumulator<F> for SumAccumulator<M>
where
    F: From<i64>,
    M: Fn(&[F]) -> i64 + Send + Sync,
{
    #[inline]
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        let value = (self.mapper)(tuple);
        self.total += value;
        Undo::Subtract(value)
    }

    #[inline]
    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(matches!(undo, Undo::Subtract(_)), "sum expects a subtraction");
        if let Undo::Subtract(value) = undo {
            self.total -= value;
        }
    }

    fn result(&self) -> Option<F> {
        Some(F::from(self.total))
    }
}
