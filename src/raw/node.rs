use core::borrow::Borrow;
use core::fmt;

use smallvec::SmallVec;

use super::arena::Slot;

// Inline capacity for node storage; nodes at small orders never touch the heap.
const INLINE: usize = 8;

/// Stable node identity, assigned at node creation and never reused.
///
/// Arena slots are recycled when nodes are freed, so a `Slot` cannot serve as
/// an identity. `NodeId` can: it is monotone over the lifetime of the tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A B-tree node. A node is a leaf iff it has no children; an internal node
/// always has exactly `keys.len() + 1` children.
pub(crate) struct Node<K> {
    id: NodeId,
    keys: SmallVec<[K; INLINE]>,
    children: SmallVec<[Slot; INLINE]>,
}

/// Result of searching for a key within a single node.
pub(crate) enum Search {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is the child to descend into (equivalently,
    /// where the key would be inserted in a leaf).
    Descend(usize),
}

impl<K> Node<K> {
    /// Creates a new empty leaf node.
    pub(crate) fn new_leaf(id: NodeId) -> Self {
        Self {
            id,
            keys: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn child(&self, index: usize) -> Slot {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Slot] {
        &self.children
    }

    pub(crate) fn insert_key(&mut self, index: usize, key: K) {
        self.keys.insert(index, key);
    }

    pub(crate) fn remove_key(&mut self, index: usize) -> K {
        self.keys.remove(index)
    }

    /// Overwrites the key at `index`, returning the previous key.
    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> K {
        core::mem::replace(&mut self.keys[index], key)
    }

    pub(crate) fn push_key(&mut self, key: K) {
        self.keys.push(key);
    }

    pub(crate) fn pop_key(&mut self) -> K {
        self.keys.pop().expect("`Node::pop_key()` - node has no keys!")
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: Slot) {
        self.children.insert(index, child);
    }

    pub(crate) fn remove_child(&mut self, index: usize) -> Slot {
        self.children.remove(index)
    }

    pub(crate) fn push_child(&mut self, child: Slot) {
        self.children.push(child);
    }

    pub(crate) fn pop_child(&mut self) -> Slot {
        self.children.pop().expect("`Node::pop_child()` - node has no children!")
    }

    /// Binary search for `key` among this node's keys.
    pub(crate) fn search<Q>(&self, key: &Q) -> Search
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.keys.binary_search_by(|probe| probe.borrow().cmp(key)) {
            Ok(index) => Search::Found(index),
            Err(index) => Search::Descend(index),
        }
    }

    /// Splits this node around the key at `mid`, returning the promoted median
    /// and the new right sibling. This node keeps keys `[0, mid)` and, if
    /// internal, children `[0, mid]`; the sibling takes the rest.
    pub(crate) fn split_off(&mut self, mid: usize, right_id: NodeId) -> (K, Self) {
        debug_assert!(mid < self.keys.len());

        let right_keys: SmallVec<[K; INLINE]> = self.keys.drain(mid + 1..).collect();
        let median = self.pop_key();
        let right_children: SmallVec<[Slot; INLINE]> = if self.children.is_empty() {
            SmallVec::new()
        } else {
            self.children.drain(mid + 1..).collect()
        };

        (
            median,
            Self {
                id: right_id,
                keys: right_keys,
                children: right_children,
            },
        )
    }

    /// Absorbs a right sibling and the separator key that sat between the two
    /// nodes in their parent. Inverse of [`split_off`](Self::split_off).
    pub(crate) fn absorb(&mut self, separator: K, mut right: Self) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_leaf(order: usize) -> Node<u32> {
        let mut node = Node::new_leaf(NodeId::new(0));
        for key in 0..(2 * order - 1) {
            node.push_key(u32::try_from(key).unwrap());
        }
        node
    }

    #[test]
    fn search_found_and_descend() {
        let mut node = Node::new_leaf(NodeId::new(0));
        for key in [10u32, 20, 30] {
            node.push_key(key);
        }

        assert!(matches!(node.search(&20), Search::Found(1)));
        assert!(matches!(node.search(&5), Search::Descend(0)));
        assert!(matches!(node.search(&25), Search::Descend(2)));
        assert!(matches!(node.search(&40), Search::Descend(3)));
    }

    #[test]
    fn split_full_leaf() {
        for order in 2..=5 {
            let mut left = full_leaf(order);
            let (median, right) = left.split_off(order - 1, NodeId::new(1));

            assert_eq!(left.key_count(), order - 1);
            assert_eq!(right.key_count(), order - 1);
            assert_eq!(median, u32::try_from(order - 1).unwrap());
            assert!(left.keys().iter().all(|&k| k < median));
            assert!(right.keys().iter().all(|&k| k > median));
        }
    }

    #[test]
    fn split_full_internal() {
        for order in 2..=5 {
            let mut left = full_leaf(order);
            for index in 0..(2 * order) {
                left.push_child(Slot::from_index(index));
            }

            let (_, right) = left.split_off(order - 1, NodeId::new(1));
            assert_eq!(left.child_count(), order);
            assert_eq!(right.child_count(), order);
        }
    }

    #[test]
    fn absorb_undoes_split() {
        let mut left = full_leaf(3);
        let original: Vec<u32> = left.keys().to_vec();

        let (median, right) = left.split_off(2, NodeId::new(1));
        left.absorb(median, right);
        assert_eq!(left.keys(), original.as_slice());
    }
}
