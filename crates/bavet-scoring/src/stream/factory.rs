//! Builder of stream descriptors.

use std::sync::Arc;

use bavet_core::{BavetError, Fact, Result};

use super::{Joiner, KeyFn, StreamDef, StreamId, StreamKind};
use crate::collector::SharedCollector;
use crate::tuple::MAX_ARITY;

/// Records constraint streams for one fact type.
///
/// Every method validates arities eagerly and returns
/// [`BavetError::Config`] for an impossible stream.
///
/// # Example
///
/// ```
/// use bavet_scoring::stream::{joiner, ConstraintFactory};
/// use bavet_test::nqueens::queen_parts;
/// use bavet_test::{Class, Value};
///
/// let row = |t: &[Value]| Value::Int(queen_parts(&t[0]).2.unwrap_or(-1));
/// let id = |t: &[Value]| queen_parts(&t[0]).0;
///
/// let mut factory = ConstraintFactory::<Value>::new();
/// let queens = factory.for_each(Class::Queen);
/// let pairs = factory
///     .join(queens, queens, vec![joiner::equal(row), joiner::less_than(id, id)])
///     .unwrap();
/// assert_eq!(factory.arity(pairs).unwrap(), 2);
/// ```
pub struct ConstraintFactory<F: Fact> {
    pub(crate) streams: Vec<StreamDef<F>>,
}

impl<F: Fact> Default for ConstraintFactory<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Fact> ConstraintFactory<F> {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
        }
    }

    /// Number of streams defined so far.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Output arity of a stream.
    pub fn arity(&self, stream: StreamId) -> Result<usize> {
        self.streams
            .get(stream.0)
            .map(|def| def.arity)
            .ok_or_else(|| BavetError::config(format!("{:?} is not defined in this factory", stream)))
    }

    fn push(&mut self, kind: StreamKind<F>, arity: usize) -> StreamId {
        self.streams.push(StreamDef { kind, arity });
        StreamId(self.streams.len() - 1)
    }

    /// Every assigned fact of `class`.
    ///
    /// Facts whose [`Fact::is_assigned`] is false are skipped until an update
    /// assigns them.
    pub fn for_each(&mut self, class: F::Class) -> StreamId {
        self.push(
            StreamKind::ForEach {
                class,
                include_unassigned: false,
            },
            1,
        )
    }

    /// Every fact of `class`, assigned or not.
    pub fn for_each_including_unassigned(&mut self, class: F::Class) -> StreamId {
        self.push(
            StreamKind::ForEach {
                class,
                include_unassigned: true,
            },
            1,
        )
    }

    /// Tuples of `stream` accepted by `predicate`.
    pub fn filter<P>(&mut self, stream: StreamId, predicate: P) -> Result<StreamId>
    where
        P: Fn(&[F]) -> bool + Send + Sync + 'static,
    {
        let arity = self.arity(stream)?;
        Ok(self.push(
            StreamKind::Filter {
                parent: stream,
                predicate: Arc::new(predicate),
            },
            arity,
        ))
    }

    /// Pairs of left and right tuples satisfying every joiner.
    ///
    /// The output tuple holds the left facts followed by the right facts.
    pub fn join(
        &mut self,
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
    ) -> Result<StreamId> {
        let arity = self.arity(left)? + self.arity(right)?;
        if arity > MAX_ARITY {
            return Err(BavetError::config(format!(
                "join of {:?} and {:?} would produce {} facts per tuple, at most {} are supported",
                left, right, arity, MAX_ARITY
            )));
        }
        Ok(self.push(
            StreamKind::Join {
                left,
                right,
                joiners,
            },
            arity,
        ))
    }

    /// Left tuples for which at least one right tuple satisfies every joiner.
    pub fn if_exists(
        &mut self,
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
    ) -> Result<StreamId> {
        self.exists(left, right, joiners, true)
    }

    /// Left tuples for which no right tuple satisfies every joiner.
    pub fn if_not_exists(
        &mut self,
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
    ) -> Result<StreamId> {
        self.exists(left, right, joiners, false)
    }

    fn exists(
        &mut self,
        left: StreamId,
        right: StreamId,
        joiners: Vec<Joiner<F>>,
        should_exist: bool,
    ) -> Result<StreamId> {
        let arity = self.arity(left)?;
        self.arity(right)?;
        Ok(self.push(
            StreamKind::Exists {
                left,
                right,
                joiners,
                should_exist,
            },
            arity,
        ))
    }

    /// One tuple per distinct group key: the key facts followed by one result
    /// per collector.
    ///
    /// With no keys, all tuples fall in one group, which exists only while it
    /// has members.
    pub fn group_by(
        &mut self,
        stream: StreamId,
        keys: Vec<KeyFn<F>>,
        collectors: Vec<SharedCollector<F>>,
    ) -> Result<StreamId> {
        self.arity(stream)?;
        let arity = keys.len() + collectors.len();
        if arity == 0 || arity > MAX_ARITY {
            return Err(BavetError::config(format!(
                "group_by needs between 1 and {} keys and collectors in total, got {}",
                MAX_ARITY, arity
            )));
        }
        Ok(self.push(
            StreamKind::GroupBy {
                parent: stream,
                keys,
                collectors,
            },
            arity,
        ))
    }

    /// Replaces each tuple by the results of `mappers`.
    pub fn map(&mut self, stream: StreamId, mappers: Vec<KeyFn<F>>) -> Result<StreamId> {
        self.arity(stream)?;
        let arity = mappers.len();
        if arity == 0 || arity > MAX_ARITY {
            return Err(BavetError::config(format!(
                "map needs between 1 and {} mappers, got {}",
                MAX_ARITY, arity
            )));
        }
        Ok(self.push(
            StreamKind::Map {
                parent: stream,
                mappers,
            },
            arity,
        ))
    }

    /// Replaces the last fact of each tuple by every fact it flattens into.
    pub fn flatten_last<X>(&mut self, stream: StreamId, flattener: X) -> Result<StreamId>
    where
        X: Fn(&F) -> Vec<F> + Send + Sync + 'static,
    {
        let arity = self.arity(stream)?;
        Ok(self.push(
            StreamKind::FlattenLast {
                parent: stream,
                flattener: Arc::new(flattener),
            },
            arity,
        ))
    }

    /// Every tuple of `left` and every tuple of `right`.
    pub fn concat(&mut self, left: StreamId, right: StreamId) -> Result<StreamId> {
        let arity = self.arity(left)?;
        let right_arity = self.arity(right)?;
        if arity != right_arity {
            return Err(BavetError::config(format!(
                "concat of {:?} (arity {}) and {:?} (arity {}) needs equal arities",
                left, arity, right, right_arity
            )));
        }
        Ok(self.push(StreamKind::Concat { left, right }, arity))
    }

    /// One tuple per distinct combination of facts.
    pub fn distinct(&mut self, stream: StreamId) -> Result<StreamId> {
        let arity = self.arity(stream)?;
        Ok(self.push(StreamKind::Distinct { parent: stream }, arity))
    }
}
