//! Load balance collector: unfairness of load spread over balanced keys.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use super::{Accumulator, Collector, SharedCollector, Undo};

/// Creates a collector measuring how unevenly a metric is spread over keys.
///
/// The result is the unfairness, the square root of the summed squared
/// deviations of each key's load from the mean, rounded to an integer.
/// Zero means perfectly balanced. Tuples with a zero metric are ignored.
///
/// # Example
///
/// ```
/// use bavet_scoring::collector::{load_balance, Collector};
/// use bavet_test::Value;
///
/// // (employee, hours) tuples
/// let collector = load_balance(
///     |t: &[Value]| t[0].clone(),
///     |t: &[Value]| t[1].as_int().unwrap_or(0),
/// );
/// let mut acc = collector.supply();
///
/// acc.accumulate(&[Value::text("ann"), Value::Int(2)]);
/// let bob = acc.accumulate(&[Value::text("bob"), Value::Int(1)]);
/// // Loads 2 and 1: sqrt(0.5) rounds to 1
/// assert_eq!(acc.result(), Some(Value::Int(1)));
///
/// acc.undo(bob);
/// assert_eq!(acc.result(), Some(Value::Int(0)));
/// ```
pub fn load_balance<F, KF, MF>(key: KF, metric: MF) -> SharedCollector<F>
where
    F: Clone + Eq + Hash + From<i64> + Send + Sync + 'static,
    KF: Fn(&[F]) -> F + Send + Sync + 'static,
    MF: Fn(&[F]) -> i64 + Send + Sync + 'static,
{
    Arc::new(LoadBalanceCollector {
        key: Arc::new(key),
        metric: Arc::new(metric),
    })
}

struct LoadBalanceCollector<KF, MF> {
    key: Arc<KF>,
    metric: Arc<MF>,
}

impl<F, KF, MF> Collector<F> for LoadBalanceCollector<KF, MF>
where
    F: Clone + Eq + Hash + From<i64> + Send + Sync + 'static,
    KF: Fn(&[F]) -> F + Send + Sync + 'static,
    MF: Fn(&[F]) -> i64 + Send + Sync + 'static,
{
    fn supply(&self) -> Box<dyn Accumulator<F>> {
        let key = Arc::clone(&self.key);
        let metric = Arc::clone(&self.metric);
        Box::new(MappedLoadBalance {
            key,
            metric,
            state: LoadBalanceAccumulator::new(),
        })
    }
}

struct MappedLoadBalance<F, KF, MF> {
    key: Arc<KF>,
    metric: Arc<MF>,
    state: LoadBalanceAccumulator<F>,
}

impl<F, KF, MF> Accumulator<F> for MappedLoadBalance<F, KF, MF>
where
    F: Clone + Eq + Hash + From<i64> + Send,
    KF: Fn(&[F]) -> F + Send + Sync,
    MF: Fn(&[F]) -> i64 + Send + Sync,
{
    fn accumulate(&mut self, tuple: &[F]) -> Undo<F> {
        let key = (self.key)(tuple);
        let metric = (self.metric)(tuple);
        if metric == 0 {
            return Undo::Nothing;
        }
        self.state.add(&key, metric);
        Undo::ReleaseWeighted(key, metric)
    }

    fn undo(&mut self, undo: Undo<F>) {
        debug_assert!(
            matches!(undo, Undo::ReleaseWeighted(..)),
            "load_balance expects a weighted release"
        );
        if let Undo::ReleaseWeighted(key, metric) = undo {
            self.state.remove(&key, metric);
        }
    }

    fn result(&self) -> Option<F> {
        Some(F::from(self.state.unfairness()))
    }
}

/// Incremental variance over per-key loads.
///
/// Each update adjusts the squared deviation in O(1), splitting it into an
/// integral part and a fraction numerator over the key count.
#[derive(Debug, Clone)]
pub struct LoadBalanceAccumulator<K> {
    item_counts: HashMap<K, usize>,
    loads: HashMap<K, i64>,
    sum: i64,
    squared_deviation_integral: i64,
    squared_deviation_fraction_numerator: i64,
}

impl<K: Eq + Hash> PartialEq for LoadBalanceAccumulator<K> {
    fn eq(&self, other: &Self) -> bool {
        self.item_counts == other.item_counts
            && self.loads == other.loads
            && self.sum == other.sum
            && self.squared_deviation_integral == other.squared_deviation_integral
            && self.squared_deviation_fraction_numerator
                == other.squared_deviation_fraction_numerator
    }
}

impl<K: Eq + Hash> Eq for LoadBalanceAccumulator<K> {}

impl<K: Clone + Eq + Hash> Default for LoadBalanceAccumulator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> LoadBalanceAccumulator<K> {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self {
            item_counts: HashMap::new(),
            loads: HashMap::new(),
            sum: 0,
            squared_deviation_integral: 0,
            squared_deviation_fraction_numerator: 0,
        }
    }

    /// Adds `metric` to the load of `key`.
    pub fn add(&mut self, key: &K, metric: i64) {
        *self.item_counts.entry(key.clone()).or_insert(0) += 1;
        self.add_to_load(key, metric);
    }

    /// Reverses one [`add`](Self::add) of the same key and metric.
    pub fn remove(&mut self, key: &K, metric: i64) {
        let Some(count) = self.item_counts.get_mut(key) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.item_counts.remove(key);
            self.reset_load(key);
        } else {
            self.add_to_load(key, -metric);
        }
    }

    /// Current load of every balanced key.
    pub fn loads(&self) -> &HashMap<K, i64> {
        &self.loads
    }

    /// Unfairness, rounded to the nearest integer.
    pub fn unfairness(&self) -> i64 {
        let n = self.item_counts.len();
        let squared = match n {
            0 => return 0,
            1 => {
                self.squared_deviation_fraction_numerator as f64
                    + self.squared_deviation_integral as f64
            }
            _ => {
                self.squared_deviation_fraction_numerator as f64 / n as f64
                    + self.squared_deviation_integral as f64
            }
        };
        squared.max(0.0).sqrt().round() as i64
    }

    fn add_to_load(&mut self, key: &K, diff: i64) {
        let old_value = self.loads.get(key).copied().unwrap_or(0);
        let new_value = old_value + diff;
        if old_value != new_value {
            self.loads.insert(key.clone(), new_value);
            self.update_squared_deviation(old_value, new_value);
            self.sum += diff;
        }
    }

    fn reset_load(&mut self, key: &K) {
        if let Some(old_value) = self.loads.remove(key) {
            if old_value != 0 {
                self.update_squared_deviation(old_value, 0);
                self.sum -= old_value;
            }
        }
    }

    fn update_squared_deviation(&mut self, old_value: i64, new_value: i64) {
        let term1 = new_value * new_value - old_value * old_value;

        let sum_others = 2 * (self.sum - old_value);
        let new_sum = self.sum - old_value + new_value;
        let sum_diff = self.sum - new_sum;

        let term3 = new_sum * new_sum - self.sum * self.sum;
        let term4 = 2 * (old_value * self.sum - new_value * new_sum);

        self.squared_deviation_integral += term1;
        self.squared_deviation_fraction_numerator += sum_others * sum_diff + term3 + term4;
    }
}
