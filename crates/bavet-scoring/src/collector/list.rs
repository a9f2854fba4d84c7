//! To-list collector.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector gathering mapped values into a list, in insertion order.
///
/// Duplicates are kept. Undoing removes exactly the element its insertion
/// added, even when an equal element was inserted before it.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{to_list, Collector};
/// use bavet_test::Value;
///
/// let collector = to_list(|t: &[Value]| t[0].clone());
/// let mut acc = collector.supply();
///
/// acc.accumulate(&[Value::Int(1)]);
/// let second = acc.accumulate(&[Value::Int(2)]);
/// acc.accumulate(&[Value::Int(1)]);
/// acc.undo(second);
///
/// assert_eq!(
///     acc.result(),
///     Some(Value::List(vec![Value::Int(1), Value::Int(1)]))
/// );
/// ```
pub fn to_list<F, M>(mapper: M) -> SharedCollector<F>
where
    F: Clone + From<Vec<F>> + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
{
    Arc::new(ToListCollector {
        mapper: Arc::new(mapper),
    })
}

struct ToListCollector<M> {
    mapper: Arc<M>,
}

impl<F, M> Collector<F> for ToListCollector<M>
where
    F: Clone + From<Vec<F>> + Send + Sync + 'static,
    M: Fn(&[F]) -> F + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(ToListAccumulator {
            mapper: Arc::clone(&self.mapper),
            next_sequence: 0,
            entries: BTreeMap::new(),
        })
    }
}

struct ToListAccumulator<F, M> {
    mapper: Arc<M>,
    next_sequence: u64,
    entries: BTreeMap<u64, F>,
}

impl<F, M> Accumulator<F> for ToListAccumulator<F, M>
where
    F: Clone + From<Vec<F>> + Send,
    M: Fn(&[F]) -> F + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(sequence, (self.mapper)(tuple));
        Undo::Entry(sequence)
    }

    fn undo(&mut self, undo: Undo<F>) {
        if let Undo::Entry(sequence) = undo {
            self.entries.remove(&sequence);
        }
    }

    fn result(&self) -> Option<F> {
        Some(F::from(self.entries.values().cloned().collect()))
    }
}
