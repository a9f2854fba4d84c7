//! Collector combinators: composition, conditional collection, custom suppliers.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Combines several collectors into one whose result merges theirs.
///
/// Parts accumulate positionally; the undo token carries one token per part.
/// The merged result is `None` if any part has no result.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{compose, count, sum, Collector};
/// use bavet_test::Value;
///
/// // Average of integers, as an integer.
/// let average = compose(
///     vec![
///         sum(|t: &[Value]| t[0].as_int().unwrap_or(0)),
///         count(),
///     ],
///     |parts: &[Value]| {
///         let total = parts[0].as_int().unwrap_or(0);
///         let n = parts[1].as_int().unwrap_or(1).max(1);
///         Value::Int(total / n)
///     },
/// );
/// let mut acc = average.supply();
/// acc.accumulate(&[Value::Int(4)]);
/// acc.accumulate(&[Value::Int(8)]);
/// assert_eq!(acc.result(), Some(Value::Int(6)));
/// ```
pub fn compose<F, G>(parts: Vec<SharedCollector<F>>, merger: G) -> SharedCollector<F>
where
    F: Send + Sync + 'static,
    G: Fn(&[F]) -> F + Send + Sync + 'static,
{
    Arc::new(ComposeCollector {
        parts,
        merger: Arc::new(merger),
    })
}

struct ComposeCollector<F, G> {
    parts: Vec<SharedCollector<F>>,
    merger: Arc<G>,
}

impl<F, G> Collector<F> for ComposeCollector<F, G>
where
    F: Send + Sync + 'static,
    G: Fn(&[F]) -> F + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(ComposeAccumulator {
            parts: self.parts.iter().map(|part| part.supply()).collect(),
            merger: Arc::clone(&self.merger),
        })
    }
}

struct ComposeAccumulator<F, G> {
    parts: Vec<Box<dyn Accumulator<F>>>,
    merger: Arc<G>,
}

impl<F, G> Accumulator<F> for ComposeAccumulator<F, G>
where
    F: Send + Sync + 'static,
    G: Fn(&[F]) -> F + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        Undo::Composite(
            self.parts
                .iter_mut()
                .map(|part| part.accumulate(tuple))
                .collect(),
        )
    }

    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(
            matches!(&undo, Undo::Composite(undos) if undos.len() == self.parts.len()),
            "compose expects one token per part"
        );
        if let Undo::Composite(undos) = undo {
            for (part, undo) in self.parts.iter_mut().zip(undos) {
                part.undo(undo);
            }
        }
    }

    fn result(&self) -> Option<F> {
        let results = self
            .parts
            .iter()
            .map(|part| part.result())
            .collect::<Option<SmallVec<[F; 4]>>>()?;
        Some((self.merger)(&results))
    }
}

/// Only passes tuples matching `predicate` to `inner`.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{conditionally, count, Collector};
/// use bavet_test::Value;
///
/// let positives = conditionally(|t: &[Value]| t[0].as_int() > Some(0), count());
/// let mut acc = positives.supply();
/// acc.accumulate(&[Value::Int(-1)]);
/// acc.accumulate(&[Value::Int(2)]);
/// assert_eq!(acc.result(), Some(Value::Int(1)));
/// ```
pub fn conditionally<F, P>(predicate: P, inner: SharedCollector<F>) -> SharedCollector<F>
where
    F: Send + Sync + 'static,
    P: Fn(&[F]) -> bool + Send + Sync + 'static,
{
    Arc::new(ConditionalCollector {
        predicate: Arc::new(predicate),
        inner,
    })
}

struct ConditionalCollector<F, P> {
    predicate: Arc<P>,
    inner: SharedCollector<F>,
}

impl<F, P> Collector<F> for ConditionalCollector<F, P>
where
    F: Send + Sync + 'static,
    P: Fn(&[F]) -> bool + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        Box::new(ConditionalAccumulator {
            predicate: Arc::clone(&self.predicate),
            inner: self.inner.supply(),
        })
    }
}

struct ConditionalAccumulator<F, P> {
    predicate: Arc<P>,
    inner: Box<dyn Accumulator<F>>,
}

impl<F, P> Accumulator<F> for ConditionalAccumulator<F, P>
where
    F: Send + Sync + 'static,
    P: Fn(&[F]) -> bool + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        if (self.predicate)(tuple) {
            self.inner.accumulate(tuple)
        } else {
            Undo::Nothing
        }
    }

    fn undo(&mut self, undo: Undo<F>) {
        if !matches!(undo, Undo::Nothing) {
            self.inner.undo(undo);
        }
    }

    fn result(&self) -> Option<F> {
        self.inner.result()
    }
}

/// Wraps a supplier of user-written accumulators into a collector.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{custom, Accumulator, Collector, Undo};
/// use bavet_test::Value;
///
/// // Product of integers; undo divides the factor back out.
/// struct Product(i64);
///
/// impl Accumulator<Value> for Product {
///     fn accumulate(&mut self, tuple: &[Value]) -> Undo<Value> {
///         let factor = tuple[0].as_int().unwrap_or(1);
///         self.0 *= factor;
///         Undo::Release(Value::Int(factor))
///     }
///
///     fn undo(&mut self, undo: Undo<Value>) {
///         if let Undo::Release(Value::Int(factor)) = undo {
///             self.0 /= factor;
///         }
///     }
///
///     fn result(&self) -> Option<Value> {
///         Some(Value::Int(self.0))
///     }
/// }
///
/// let product = custom(|| Box::new(Product(1)) as Box<dyn Accumulator<Value>>);
/// let mut acc = product.supply();
/// let three = acc.accumulate(&[Value::Int(3)]);
/// acc.accumulate(&[Value::Int(4)]);
/// acc.undo(three);
/// assert_eq!(acc.result(), Some(Value::Int(4)));
/// ```
pub fn custom<F, S>(supplier: S) -> SharedCollector<F>
where
    F: 'static,
    S: Fn() -> Box<dyn Accumulator<F>> + Send + Sync + 'static,
{
    Arc::new(CustomCollector { supplier })
}

struct CustomCollector<S> {
    supplier: S,
}

impl<F, S> Collector<F> for CustomCollector<S>
where
    F: 'static,
    S: Fn() -> Box<dyn Accumulator<F>> + Send + Sync,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        (self.supplier)()
    }
}
