use std::fmt;

use smallvec::SmallVec;

/// Immutable composite key: the results of the key functions of one tuple.
///
/// Hashed and compared as a whole record. A node stores the keys it indexed
/// a tuple under in that tuple's slot, so removal uses the identical value
/// even if the tuple's facts changed since.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct IndexKeys<K>(SmallVec<[K; 2]>);

impl<K> IndexKeys<K> {
    /// The zero-component key, used by unindexed joins and global groups.
    pub fn empty() -> Self {
        IndexKeys(SmallVec::new())
    }

    /// A single-component key.
    pub fn single(key: K) -> Self {
        let mut components = SmallVec::new();
        components.push(key);
        IndexKeys(components)
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the zero-component key.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The components, outermost level first.
    #[inline]
    pub fn as_slice(&self) -> &[K] {
        &self.0
    }
}

impl<K> FromIterator<K> for IndexKeys<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        IndexKeys(iter.into_iter().collect())
    }
}

impl<K: fmt::Debug> fmt::Debug for IndexKeys<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IndexKeys").field(&self.0.as_slice()).finish()
    }
}
