//! The public [`BTreeIndex`] facade and its iterators.

use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use crate::error::{Error, Result};
use crate::raw::{NodeId, RawBTree, RawIter, RawTraverse, RawTraverseEntry};

/// An ordered index over a single key type, backed by a classic B-tree of a
/// caller-chosen order.
///
/// The *order* is the textbook branching parameter `t`: every node holds
/// between `order - 1` and `2 * order - 1` keys (the root may hold fewer) and
/// an internal node with `k` keys has exactly `k + 1` children. All leaves sit
/// at the same depth, so `find`, `insert`, and `remove` touch O(log n) nodes.
///
/// Duplicate keys are rejected: the index is a set, and every failed operation
/// leaves it exactly as it was.
///
/// It is a logic error for a key to be modified in such a way that its
/// ordering relative to any other key, as determined by the [`Ord`] trait,
/// changes while it is in the index. Use [`update`](Self::update) to replace a
/// key in place; it refuses replacements that would disturb the order.
///
/// # Examples
///
/// ```
/// use koji_tree::BTreeIndex;
///
/// let mut index = BTreeIndex::new(3)?;
///
/// index.insert(20)?;
/// index.insert(10)?;
/// index.insert(30)?;
///
/// assert!(index.contains(&10));
/// assert_eq!(index.len(), 3);
///
/// index.remove(&20);
/// let keys: Vec<i32> = index.iter().copied().collect();
/// assert_eq!(keys, [10, 30]);
/// # Ok::<(), koji_tree::Error>(())
/// ```
pub struct BTreeIndex<K> {
    raw: RawBTree<K>,
}

/// An iterator over the keys of a [`BTreeIndex`] in ascending order.
///
/// This `struct` is created by the [`iter`] method on [`BTreeIndex`].
/// See its documentation for more.
///
/// [`iter`]: BTreeIndex::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K: 'a> {
    inner: RawIter<'a, K>,
}

/// A pre-order iterator over the nodes of a [`BTreeIndex`].
///
/// This `struct` is created by the [`traverse`] method on [`BTreeIndex`].
/// See its documentation for more.
///
/// [`traverse`]: BTreeIndex::traverse
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Traverse<'a, K: 'a> {
    inner: RawTraverse<'a, K>,
}

/// One node of a pre-order traversal, as yielded by [`Traverse`].
///
/// Parents are always yielded before their children, so a consumer can build
/// the tree shape (or render it) in a single pass.
#[derive(Debug, Clone, Copy)]
pub struct TraverseEntry<'a, K> {
    /// Stable identity of this node.
    pub node: NodeId,
    /// Identity of this node's parent; `None` for the root.
    pub parent: Option<NodeId>,
    /// Distance from the root in edges; the root is at depth 0.
    pub depth: usize,
    /// The keys stored in this node, in ascending order.
    pub keys: &'a [K],
}

impl<K> BTreeIndex<K> {
    /// Makes a new, empty `BTreeIndex` of the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if `order < 2`; a node must be able to
    /// hold at least one key and split around a median.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::{BTreeIndex, Error};
    ///
    /// let index: BTreeIndex<i32> = BTreeIndex::new(2)?;
    /// assert!(index.is_empty());
    ///
    /// assert!(matches!(BTreeIndex::<i32>::new(1), Err(Error::InvalidOrder(1))));
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    pub fn new(order: usize) -> Result<Self> {
        if order < 2 {
            return Err(Error::InvalidOrder(order));
        }
        Ok(Self {
            raw: RawBTree::new(order),
        })
    }

    /// Returns the branching parameter this index was created with.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.raw.order()
    }

    /// Returns the number of keys in the index.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// assert_eq!(index.len(), 0);
    /// index.insert(1)?;
    /// assert_eq!(index.len(), 1);
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the index contains no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the depth of the tree in edges from the root to any leaf.
    ///
    /// An empty index (or one whose keys all fit in the root) has depth 0.
    /// All leaves sit at the same depth, so this is well defined.
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.raw.depth()
    }

    /// Removes every key from the index, keeping the configured order.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator that visits the keys in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// for key in [3, 1, 2] {
    ///     index.insert(key)?;
    /// }
    ///
    /// let keys: Vec<i32> = index.iter().copied().collect();
    /// assert_eq!(keys, [1, 2, 3]);
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.raw.iter(),
        }
    }

    /// Gets an iterator that visits every node in pre-order, yielding a
    /// [`TraverseEntry`] per node.
    ///
    /// The traversal is read-only and restartable; it borrows the index, so
    /// the borrow checker rules out mutation while it is live.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// for key in 1..=7 {
    ///     index.insert(key)?;
    /// }
    ///
    /// let root = index.traverse().next().unwrap();
    /// assert_eq!(root.depth, 0);
    /// assert_eq!(root.parent, None);
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    pub fn traverse(&self) -> Traverse<'_, K> {
        Traverse {
            inner: self.raw.traverse(),
        }
    }
}

impl<K: Ord> BTreeIndex<K> {
    /// Returns the node and in-node position holding `key`, or `None` if the
    /// key is absent.
    ///
    /// The key may be any borrowed form of the index's key type, but the
    /// ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// index.insert(String::from("apple"))?;
    ///
    /// assert!(index.find("apple").is_some());
    /// assert!(index.find("pear").is_none());
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn find<Q>(&self, key: &Q) -> Option<(NodeId, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.find(key)
    }

    /// Returns `true` if the index contains `key`.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.find(key).is_some()
    }

    /// Adds `key` to the index.
    ///
    /// Full nodes are split on the way down, so the insertion finishes in a
    /// single descent and the tree grows only at the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if the key is already present; the key
    /// set is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::{BTreeIndex, Error};
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// index.insert(5)?;
    /// assert_eq!(index.insert(5), Err(Error::DuplicateKey));
    /// assert_eq!(index.len(), 1);
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K) -> Result<()> {
        if self.raw.insert(key) {
            Ok(())
        } else {
            Err(Error::DuplicateKey)
        }
    }
}

impl<K: Ord + Clone> BTreeIndex<K> {
    /// Removes `key` from the index, returning whether it was present.
    ///
    /// Minimal nodes on the path are refilled (by borrowing from a sibling or
    /// merging with one) before they are descended into, so the removal
    /// finishes in a single pass and the tree shrinks only at the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// index.insert(2)?;
    ///
    /// assert!(index.remove(&2));
    /// assert!(!index.remove(&2));
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove(&mut self, key: &K) -> bool {
        self.raw.remove(key)
    }

    /// Replaces `old` with `new` in place, without rebalancing.
    ///
    /// The replacement must order the same way `old` does against the rest of
    /// the index: strictly between `old`'s in-order neighbors. Anything else
    /// would silently corrupt the search order, so it is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `old` is absent and
    /// [`Error::UpdateOutOfOrder`] if `new` falls outside the open interval
    /// between `old`'s neighbors. Either way the index is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use koji_tree::{BTreeIndex, Error};
    ///
    /// let mut index = BTreeIndex::new(2)?;
    /// for key in [10, 20, 30] {
    ///     index.insert(key)?;
    /// }
    ///
    /// index.update(&20, 25)?;
    /// assert_eq!(index.update(&25, 5), Err(Error::UpdateOutOfOrder));
    ///
    /// let keys: Vec<i32> = index.iter().copied().collect();
    /// assert_eq!(keys, [10, 25, 30]);
    /// # Ok::<(), koji_tree::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn update(&mut self, old: &K, new: K) -> Result<()> {
        self.raw.update(old, new)
    }
}

impl<K: fmt::Debug> fmt::Debug for BTreeIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K> IntoIterator for &'a BTreeIndex<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next()
    }
}

impl<K> FusedIterator for Iter<'_, K> {}

impl<'a, K> Iterator for Traverse<'a, K> {
    type Item = TraverseEntry<'a, K>;

    fn next(&mut self) -> Option<TraverseEntry<'a, K>> {
        let RawTraverseEntry {
            node,
            parent,
            depth,
            keys,
        } = self.inner.next()?;
        Some(TraverseEntry {
            node,
            parent,
            depth,
            keys,
        })
    }
}

impl<K> FusedIterator for Traverse<'_, K> {}
