//! Key-partitioned tuple index used by join and exists nodes.
//!
//! An [`Indexer`] maps a composite key to the set of entries sharing it.
//! Each key component adds one hashed level ([`Indexer::Equals`]); the last
//! level holds an insertion-ordered bucket ([`Indexer::Unindexed`]). A join
//! without equal joiners has zero levels and is a single bucket.
//!
//! # Example
//!
//! ```
//! use bavet_scoring::index::{IndexKeys, Indexer};
//!
//! let mut index: Indexer<i64, u32> = Indexer::new(2);
//! let keys = IndexKeys::from_iter([1, 7]);
//!
//! index.put(&keys, 10).unwrap();
//! index.put(&keys, 11).unwrap();
//! assert_eq!(index.size(&keys).unwrap(), 2);
//!
//! let mut seen = Vec::new();
//! index.for_each(&keys, |e| seen.push(e)).unwrap();
//! assert_eq!(seen, vec![10, 11]);
//!
//! index.remove(&keys, 10).unwrap();
//! index.remove(&keys, 11).unwrap();
//! assert!(index.is_empty());
//! ```

mod keys;


use std::collections::HashMap;
use std::hash::Hash;

use bavet_core::{BavetError, Result};
use indexmap::IndexSet;

pub use keys::IndexKeys;

/// Recursive index over the components of an [`IndexKeys`] record.
#[derive(Debug, Clone)]
pub enum Indexer<K, E> {
    /// One hashed level; `depth` counts this level and the ones below it.
    Equals {
        depth: usize,
        children: HashMap<K, Indexer<K, E>>,
    },
    /// Terminal bucket in insertion order.
    Unindexed(IndexSet<E>),
}

impl<K, E> Indexer<K, E>
where
    K: Clone + Eq + Hash,
    E: Copy + Eq + Hash,
{
    /// Creates an empty indexer with one level per key component.
    pub fn new(depth: usize) -> Self {
        if depth == 0 {
            Indexer::Unindexed(IndexSet::new())
        } else {
            Indexer::Equals {
                depth,
                children: HashMap::new(),
            }
        }
    }

    /// Number of key components this indexer expects.
    pub fn depth(&self) -> usize {
        match self {
            Indexer::Equals { depth, .. } => *depth,
            Indexer::Unindexed(_) => 0,
        }
    }

    /// Indexes `entry` under `keys`, creating downstream levels lazily.
    ///
    /// # Errors
    ///
    /// Fails if `keys` does not have one component per level, or if the entry
    /// is already indexed under the same keys.
    pub fn put(&mut self, keys: &IndexKeys<K>, entry: E) -> Result<()> {
        self.check_depth(keys)?;
        if self.put_at(keys.as_slice(), entry) {
            Ok(())
        } else {
            Err(BavetError::illegal_state(
                "entry is already indexed under the same keys",
            ))
        }
    }

    fn put_at(&mut self, keys: &[K], entry: E) -> bool {
        match self {
            Indexer::Equals { depth, children } => {
                let depth = *depth;
                children
                    .entry(keys[0].clone())
                    .or_insert_with(|| Indexer::new(depth - 1))
                    .put_at(&keys[1..], entry)
            }
            Indexer::Unindexed(bucket) => bucket.insert(entry),
        }
    }

    /// Removes `entry`, which must have been put under the identical `keys`.
    ///
    /// Downstream levels that become empty are deallocated.
    pub fn remove(&mut self, keys: &IndexKeys<K>, entry: E) -> Result<()> {
        self.check_depth(keys)?;
        if self.remove_at(keys.as_slice(), entry) {
            Ok(())
        } else {
            Err(BavetError::illegal_state(
                "removing an entry that was never indexed under these keys",
            ))
        }
    }

    fn remove_at(&mut self, keys: &[K], entry: E) -> bool {
        match self {
            Indexer::Equals { children, .. } => {
                let Some(child) = children.get_mut(&keys[0]) else {
                    return false;
                };
                let removed = child.remove_at(&keys[1..], entry);
                if removed && child.is_empty() {
                    children.remove(&keys[0]);
                }
                removed
            }
            Indexer::Unindexed(bucket) => bucket.shift_remove(&entry),
        }
    }

    /// Visits every entry indexed under `keys`, in insertion order.
    ///
    /// Returns immediately when nothing at all is indexed.
    pub fn for_each(&self, keys: &IndexKeys<K>, mut consumer: impl FnMut(E)) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.check_depth(keys)?;
        if let Some(bucket) = self.bucket(keys.as_slice()) {
            bucket.iter().copied().for_each(&mut consumer);
        }
        Ok(())
    }

    /// Collects the entries indexed under `keys`.
    pub fn matching(&self, keys: &IndexKeys<K>) -> Result<Vec<E>> {
        let mut entries = Vec::new();
        self.for_each(keys, |e| entries.push(e))?;
        Ok(entries)
    }

    fn bucket(&self, keys: &[K]) -> Option<&IndexSet<E>> {
        match self {
            Indexer::Equals { children, .. } => children.get(&keys[0])?.bucket(&keys[1..]),
            Indexer::Unindexed(bucket) => Some(bucket),
        }
    }

    /// Number of entries indexed under `keys`.
    pub fn size(&self, keys: &IndexKeys<K>) -> Result<usize> {
        self.check_depth(keys)?;
        Ok(self.bucket(keys.as_slice()).map_or(0, IndexSet::len))
    }

    /// Returns true if `keys` has a bucket allocated.
    pub fn contains_keys(&self, keys: &IndexKeys<K>) -> bool {
        keys.len() == self.depth() && self.bucket(keys.as_slice()).is_some()
    }

    /// Returns true if no entry is indexed.
    pub fn is_empty(&self) -> bool {
        match self {
            Indexer::Equals { children, .. } => children.is_empty(),
            Indexer::Unindexed(bucket) => bucket.is_empty(),
        }
    }

    /// Total number of indexed entries.
    pub fn len(&self) -> usize {
        match self {
            Indexer::Equals { children, .. } => children.values().map(Indexer::len).sum(),
            Indexer::Unindexed(bucket) => bucket.len(),
        }
    }

    /// Number of allocated terminal buckets.
    pub fn bucket_count(&self) -> usize {
        match self {
            Indexer::Equals { children, .. } => {
                children.values().map(Indexer::bucket_count).sum()
            }
            Indexer::Unindexed(bucket) => usize::from(!bucket.is_empty()),
        }
    }

    fn check_depth(&self, keys: &IndexKeys<K>) -> Result<()> {
        if keys.len() == self.depth() {
            Ok(())
        } else {
            Err(BavetError::illegal_state(format!(
                "indexer with {} levels used with {} key components",
                self.depth(),
                keys.len()
            )))
        }
    }
}
