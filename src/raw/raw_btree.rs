use core::borrow::Borrow;

use crate::error::{Error, Result};

use super::arena::{Arena, Slot};
use super::node::{Node, NodeId, Search};

/// The core classic B-tree of branching parameter `order` (the textbook `t`).
///
/// Every node holds at most `2 * order - 1` keys; every non-root node holds at
/// least `order - 1`. The root slot always exists, so the empty tree is an
/// empty leaf root. Mutating algorithms work top-down: `insert` splits any
/// full node before descending into it, and `remove` refills any minimal
/// child before descending, so no ancestor ever has to be revisited.
pub(crate) struct RawBTree<K> {
    nodes: Arena<Node<K>>,
    root: Slot,
    order: usize,
    len: usize,
    next_id: u64,
}

impl<K> RawBTree<K> {
    pub(crate) fn new(order: usize) -> Self {
        debug_assert!(order >= 2, "`RawBTree::new()` - `order` < 2!");

        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new_leaf(NodeId::new(0)));
        Self {
            nodes,
            root,
            order,
            len: 0,
            next_id: 1,
        }
    }

    pub(crate) const fn order(&self) -> usize {
        self.order
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of edges on the path from the root down to any leaf.
    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.nodes.get(self.root);
        while !node.is_leaf() {
            node = self.nodes.get(node.child(0));
            depth += 1;
        }
        depth
    }

    /// Drops every key and node. Node ids stay monotone across a clear.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        let id = self.fresh_id();
        self.root = self.nodes.alloc(Node::new_leaf(id));
        self.len = 0;
    }

    pub(crate) fn iter(&self) -> RawIter<'_, K> {
        RawIter {
            nodes: &self.nodes,
            stack: vec![(self.root, 0)],
        }
    }

    pub(crate) fn traverse(&self) -> RawTraverse<'_, K> {
        RawTraverse {
            nodes: &self.nodes,
            stack: vec![(self.root, None, 0)],
        }
    }

    const fn max_keys(&self) -> usize {
        2 * self.order - 1
    }

    const fn min_keys(&self) -> usize {
        self.order - 1
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl<K: Ord> RawBTree<K> {
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<(NodeId, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut slot = self.root;
        loop {
            let node = self.nodes.get(slot);
            match node.search(key) {
                Search::Found(index) => return Some((node.id(), index)),
                Search::Descend(index) => {
                    if node.is_leaf() {
                        return None;
                    }
                    slot = node.child(index);
                }
            }
        }
    }

    /// Inserts `key`, returning `false` (and leaving the tree untouched) if
    /// it is already present.
    pub(crate) fn insert(&mut self, key: K) -> bool {
        // Check for the duplicate before any splitting; a rejected insert
        // must not change the tree's shape.
        if self.find(&key).is_some() {
            return false;
        }

        if self.nodes.get(self.root).key_count() == self.max_keys() {
            // Grow a new root above the full old root so the split below has
            // a parent to promote the median into.
            let old_root = self.root;
            let id = self.fresh_id();
            let mut new_root = Node::new_leaf(id);
            new_root.push_child(old_root);
            self.root = self.nodes.alloc(new_root);
            self.split_child(self.root, 0);
        }

        let mut slot = self.root;
        loop {
            match self.nodes.get(slot).search(&key) {
                Search::Found(_) => return false,
                Search::Descend(index) => {
                    let node = self.nodes.get(slot);
                    if node.is_leaf() {
                        self.nodes.get_mut(slot).insert_key(index, key);
                        self.len += 1;
                        return true;
                    }

                    let child = node.child(index);
                    if self.nodes.get(child).key_count() == self.max_keys() {
                        self.split_child(slot, index);
                        // The promoted median may shift the descent index;
                        // re-search this node.
                        continue;
                    }
                    slot = child;
                }
            }
        }
    }

    /// Splits the full child at `index` of `parent`: the child keeps the low
    /// `order - 1` keys, a new right sibling takes the high `order - 1`, and
    /// the median moves up into `parent` between them.
    fn split_child(&mut self, parent: Slot, index: usize) {
        let max_keys = self.max_keys();
        let right_id = self.fresh_id();
        let child_slot = self.nodes.get(parent).child(index);

        let child = self.nodes.get_mut(child_slot);
        debug_assert_eq!(child.key_count(), max_keys, "`RawBTree::split_child()` - child is not full!");
        let (median, right) = child.split_off(self.order - 1, right_id);

        let right_slot = self.nodes.alloc(right);
        let parent_node = self.nodes.get_mut(parent);
        parent_node.insert_key(index, median);
        parent_node.insert_child(index + 1, right_slot);
    }
}

impl<K: Ord + Clone> RawBTree<K> {
    /// Removes `key`, returning `false` (and doing nothing) if it is absent.
    pub(crate) fn remove(&mut self, key: &K) -> bool {
        let removed = self.remove_at(self.root, key);

        // Only the root can end up with zero keys, since every descent refills
        // minimal children first; collapse it once the removal is done.
        let root = self.nodes.get(self.root);
        if root.key_count() == 0 && !root.is_leaf() {
            let new_root = root.child(0);
            self.nodes.free(self.root);
            self.root = new_root;
        }

        removed
    }

    fn remove_at(&mut self, slot: Slot, key: &K) -> bool {
        match self.nodes.get(slot).search(key) {
            Search::Found(index) => {
                if self.nodes.get(slot).is_leaf() {
                    self.nodes.get_mut(slot).remove_key(index);
                    self.len -= 1;
                    true
                } else {
                    self.remove_from_internal(slot, index, key)
                }
            }
            Search::Descend(index) => {
                let node = self.nodes.get(slot);
                if node.is_leaf() {
                    return false;
                }

                let child = node.child(index);
                if self.nodes.get(child).key_count() == self.min_keys() {
                    self.fill_child(slot, index);
                    // Filling may have merged the key's destination into a
                    // different child; re-dispatch from this node.
                    self.remove_at(slot, key)
                } else {
                    self.remove_at(child, key)
                }
            }
        }
    }

    /// Removes the key at `index` of the internal node `slot`: replace it with
    /// its predecessor or successor when the adjacent child can spare a key,
    /// otherwise merge the two children around it and recurse.
    fn remove_from_internal(&mut self, slot: Slot, index: usize, key: &K) -> bool {
        let min_keys = self.min_keys();
        let node = self.nodes.get(slot);
        let left = node.child(index);
        let right = node.child(index + 1);

        if self.nodes.get(left).key_count() > min_keys {
            let predecessor = self.subtree_max(left).clone();
            self.nodes.get_mut(slot).replace_key(index, predecessor.clone());
            self.remove_at(left, &predecessor)
        } else if self.nodes.get(right).key_count() > min_keys {
            let successor = self.subtree_min(right).clone();
            self.nodes.get_mut(slot).replace_key(index, successor.clone());
            self.remove_at(right, &successor)
        } else {
            let merged = self.merge_children(slot, index);
            self.remove_at(merged, key)
        }
    }

    /// Brings the minimal child at `index` of `parent` up to at least `order`
    /// keys. Borrowing from the left sibling wins over borrowing from the
    /// right; merging prefers the right sibling unless the child is the last.
    fn fill_child(&mut self, parent: Slot, index: usize) {
        let min_keys = self.min_keys();
        let node = self.nodes.get(parent);
        let child_count = node.child_count();
        let left_can_lend =
            index > 0 && self.nodes.get(node.child(index - 1)).key_count() > min_keys;
        let right_can_lend =
            index + 1 < child_count && self.nodes.get(node.child(index + 1)).key_count() > min_keys;

        if left_can_lend {
            self.borrow_from_left(parent, index);
        } else if right_can_lend {
            self.borrow_from_right(parent, index);
        } else if index + 1 < child_count {
            self.merge_children(parent, index);
        } else {
            self.merge_children(parent, index - 1);
        }
    }

    /// Rotates the left sibling's greatest key up through the parent and the
    /// separator down into the child at `index`.
    fn borrow_from_left(&mut self, parent: Slot, index: usize) {
        let node = self.nodes.get(parent);
        let left = node.child(index - 1);
        let child = node.child(index);

        let left_node = self.nodes.get_mut(left);
        let moved_key = left_node.pop_key();
        let moved_child = if left_node.is_leaf() {
            None
        } else {
            Some(left_node.pop_child())
        };

        let separator = self.nodes.get_mut(parent).replace_key(index - 1, moved_key);

        let child_node = self.nodes.get_mut(child);
        child_node.insert_key(0, separator);
        if let Some(moved_child) = moved_child {
            child_node.insert_child(0, moved_child);
        }
    }

    /// Mirror of [`borrow_from_left`](Self::borrow_from_left) for the right sibling.
    fn borrow_from_right(&mut self, parent: Slot, index: usize) {
        let node = self.nodes.get(parent);
        let right = node.child(index + 1);
        let child = node.child(index);

        let right_node = self.nodes.get_mut(right);
        let moved_key = right_node.remove_key(0);
        let moved_child = if right_node.is_leaf() {
            None
        } else {
            Some(right_node.remove_child(0))
        };

        let separator = self.nodes.get_mut(parent).replace_key(index, moved_key);

        let child_node = self.nodes.get_mut(child);
        child_node.push_key(separator);
        if let Some(moved_child) = moved_child {
            child_node.push_child(moved_child);
        }
    }

    /// Merges the children on either side of the parent's key at `index` into
    /// the left one (together with that key as separator), frees the right
    /// one, and returns the merged child's slot.
    fn merge_children(&mut self, parent: Slot, index: usize) -> Slot {
        let parent_node = self.nodes.get_mut(parent);
        let separator = parent_node.remove_key(index);
        let right = parent_node.remove_child(index + 1);
        let left = parent_node.child(index);

        let right_node = self.nodes.take(right);
        self.nodes.get_mut(left).absorb(separator, right_node);
        left
    }

    /// Replaces `old` with `new` in place, provided `new` stays strictly
    /// inside the open interval enclosing `old`'s position. The interval is
    /// the tightest one the tree implies: inherited separator bounds, in-node
    /// neighbors, and the adjacent subtree extrema when `old` sits in an
    /// internal node.
    pub(crate) fn update(&mut self, old: &K, new: K) -> Result<()> {
        let mut lower: Option<K> = None;
        let mut upper: Option<K> = None;
        let mut slot = self.root;

        loop {
            let node = self.nodes.get(slot);
            match node.search(old) {
                Search::Found(index) => {
                    let below = if node.is_leaf() {
                        if index > 0 {
                            Some(node.key(index - 1).clone())
                        } else {
                            lower
                        }
                    } else {
                        Some(self.subtree_max(node.child(index)).clone())
                    };
                    let above = if node.is_leaf() {
                        if index + 1 < node.key_count() {
                            Some(node.key(index + 1).clone())
                        } else {
                            upper
                        }
                    } else {
                        Some(self.subtree_min(node.child(index + 1)).clone())
                    };

                    if below.as_ref().is_none_or(|b| b < &new)
                        && above.as_ref().is_none_or(|a| a > &new)
                    {
                        self.nodes.get_mut(slot).replace_key(index, new);
                        return Ok(());
                    }
                    return Err(Error::UpdateOutOfOrder);
                }
                Search::Descend(index) => {
                    if node.is_leaf() {
                        return Err(Error::KeyNotFound);
                    }
                    if index > 0 {
                        lower = Some(node.key(index - 1).clone());
                    }
                    if index < node.key_count() {
                        upper = Some(node.key(index).clone());
                    }
                    slot = node.child(index);
                }
            }
        }
    }

    /// Greatest key in the subtree rooted at `slot`.
    fn subtree_max(&self, slot: Slot) -> &K {
        let mut node = self.nodes.get(slot);
        while !node.is_leaf() {
            node = self.nodes.get(node.child(node.child_count() - 1));
        }
        node.key(node.key_count() - 1)
    }

    /// Least key in the subtree rooted at `slot`.
    fn subtree_min(&self, slot: Slot) -> &K {
        let mut node = self.nodes.get(slot);
        while !node.is_leaf() {
            node = self.nodes.get(node.child(0));
        }
        node.key(0)
    }
}

/// Lazy in-order key iterator driven by an explicit stack of
/// `(slot, step)` frames rather than recursion.
///
/// For an internal node with `n` keys the steps alternate
/// child 0, key 0, child 1, key 1, ..., child n; for a leaf the steps
/// are just its keys in order.
pub(crate) struct RawIter<'a, K> {
    nodes: &'a Arena<Node<K>>,
    stack: Vec<(Slot, usize)>,
}

impl<'a, K> Iterator for RawIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let nodes = self.nodes;
            let (slot, step) = self.stack.last_mut()?;
            let node = nodes.get(*slot);

            if node.is_leaf() {
                if *step < node.key_count() {
                    let key = node.key(*step);
                    *step += 1;
                    return Some(key);
                }
                self.stack.pop();
                continue;
            }

            if *step > 2 * node.key_count() {
                self.stack.pop();
                continue;
            }

            let index = *step / 2;
            let descend = *step % 2 == 0;
            *step += 1;
            if descend {
                self.stack.push((node.child(index), 0));
            } else {
                return Some(node.key(index));
            }
        }
    }
}

/// One node of a pre-order walk.
pub(crate) struct RawTraverseEntry<'a, K> {
    pub(crate) node: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: usize,
    pub(crate) keys: &'a [K],
}

/// Lazy pre-order node iterator; parents are always yielded before their
/// children. Explicit stack, like [`RawIter`].
pub(crate) struct RawTraverse<'a, K> {
    nodes: &'a Arena<Node<K>>,
    stack: Vec<(Slot, Option<NodeId>, usize)>,
}

impl<'a, K> Iterator for RawTraverse<'a, K> {
    type Item = RawTraverseEntry<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        let (slot, parent, depth) = self.stack.pop()?;
        let node = nodes.get(slot);

        // Reversed push so the leftmost child is visited first.
        for &child in node.children().iter().rev() {
            self.stack.push((child, Some(node.id()), depth + 1));
        }

        Some(RawTraverseEntry {
            node: node.id(),
            parent,
            depth,
            keys: node.keys(),
        })
    }
}

#[cfg(test)]
impl<K: Ord + core::fmt::Debug> RawBTree<K> {
    /// Walks the whole tree and asserts every structural invariant.
    pub(crate) fn validate_invariants(&self) {
        let mut ids = std::collections::HashSet::new();
        let mut key_total = 0;
        let mut leaf_depth = None;
        self.validate_node(self.root, 0, None, None, true, &mut ids, &mut key_total, &mut leaf_depth);

        assert_eq!(key_total, self.len, "`len` does not match the stored key count");
        assert_eq!(ids.len(), self.nodes.len(), "arena holds unreachable nodes");
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_node(
        &self,
        slot: Slot,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        is_root: bool,
        ids: &mut std::collections::HashSet<NodeId>,
        key_total: &mut usize,
        leaf_depth: &mut Option<usize>,
    ) {
        let node = self.nodes.get(slot);
        assert!(ids.insert(node.id()), "duplicate node id {:?}", node.id());

        let key_count = node.key_count();
        assert!(key_count <= 2 * self.order - 1, "node over maximum keys");
        if !is_root {
            assert!(key_count >= self.order - 1, "non-root node under minimum keys");
        }

        for window in node.keys().windows(2) {
            assert!(window[0] < window[1], "keys not strictly sorted");
        }
        if key_count > 0 {
            if let Some(lower) = lower {
                assert!(lower < node.key(0), "subtree separation violated (low)");
            }
            if let Some(upper) = upper {
                assert!(node.key(key_count - 1) < upper, "subtree separation violated (high)");
            }
        }

        *key_total += key_count;

        if node.is_leaf() {
            match leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) => assert_eq!(*expected, depth, "leaves at unequal depths"),
            }
        } else {
            assert_eq!(node.child_count(), key_count + 1, "child count != key count + 1");
            for index in 0..=key_count {
                let child_lower = if index == 0 { lower } else { Some(node.key(index - 1)) };
                let child_upper = if index == key_count { upper } else { Some(node.key(index)) };
                self.validate_node(
                    node.child(index),
                    depth + 1,
                    child_lower,
                    child_upper,
                    false,
                    ids,
                    key_total,
                    leaf_depth,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn empty_tree() {
        let tree: RawBTree<u32> = RawBTree::new(2);
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(tree.find(&1).is_none());
        assert_eq!(tree.iter().count(), 0);
        tree.validate_invariants();
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut tree = RawBTree::new(2);
        assert!(tree.insert(7));
        assert!(!tree.insert(7));
        assert_eq!(tree.len(), 1);
        tree.validate_invariants();
    }

    #[test]
    fn rejected_duplicate_leaves_structure_untouched() {
        let mut tree = RawBTree::new(2);
        for key in [1, 2, 3] {
            assert!(tree.insert(key));
        }
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.traverse().count(), 1);

        // The root is full; rejecting the duplicate must not split it.
        assert!(!tree.insert(2));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.traverse().count(), 1);
        assert_eq!(tree.len(), 3);
        tree.validate_invariants();
    }

    #[test]
    fn duplicate_of_promoted_median_is_rejected() {
        let mut tree = RawBTree::new(2);
        for key in [1, 2, 3, 4, 5] {
            assert!(tree.insert(key));
        }
        // 2 was promoted out of the leaf level by the splits above.
        assert!(!tree.insert(2));
        assert_eq!(tree.len(), 5);
        tree.validate_invariants();
    }

    #[test]
    fn remove_missing_key_is_a_noop() {
        let mut tree = RawBTree::new(3);
        for key in 0..20 {
            tree.insert(key);
        }
        assert!(!tree.remove(&99));
        assert_eq!(tree.len(), 20);
        tree.validate_invariants();
    }

    #[test]
    fn remove_drains_the_tree() {
        let mut tree = RawBTree::new(2);
        for key in 0..64u32 {
            tree.insert(key);
        }
        for key in 0..64u32 {
            assert!(tree.remove(&key), "failed to remove {key}");
            tree.validate_invariants();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn update_within_interval() {
        let mut tree = RawBTree::new(2);
        for key in [10, 20, 30, 40, 50] {
            tree.insert(key);
        }

        assert_eq!(tree.update(&30, 35), Ok(()));
        tree.validate_invariants();
        assert!(tree.find(&35).is_some());
        assert!(tree.find(&30).is_none());

        // 35's neighbors are now 20 and 40.
        assert_eq!(tree.update(&35, 20), Err(Error::UpdateOutOfOrder));
        assert_eq!(tree.update(&35, 40), Err(Error::UpdateOutOfOrder));
        assert_eq!(tree.update(&35, 45), Err(Error::UpdateOutOfOrder));
        assert_eq!(tree.update(&99, 100), Err(Error::KeyNotFound));
        tree.validate_invariants();

        let keys: Vec<i32> = tree.iter().copied().collect();
        assert_eq!(keys, [10, 20, 35, 40, 50]);
    }

    #[test]
    fn update_internal_key_checks_subtree_extrema() {
        let mut tree = RawBTree::new(2);
        for key in 0..16u32 {
            tree.insert(key);
        }
        assert!(tree.find(&7).is_some());

        // 7 sits between 6 and 8 regardless of which node holds it.
        assert_eq!(tree.update(&7, 6), Err(Error::UpdateOutOfOrder));
        assert_eq!(tree.update(&7, 8), Err(Error::UpdateOutOfOrder));
        assert_eq!(tree.update(&7, 7), Ok(()));
        tree.validate_invariants();
    }

    #[test]
    fn traverse_is_pre_order() {
        let mut tree = RawBTree::new(2);
        for key in 0..10u32 {
            tree.insert(key);
        }

        let entries: Vec<_> = tree.traverse().collect();
        assert_eq!(entries[0].depth, 0);
        assert!(entries[0].parent.is_none());

        // Every parent id must already have been yielded.
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if let Some(parent) = entry.parent {
                assert!(seen.contains(&parent), "child yielded before its parent");
            }
            seen.insert(entry.node);
        }
        assert_eq!(entries.len(), seen.len());
    }

    #[test]
    fn clear_keeps_ids_monotone() {
        let mut tree = RawBTree::new(2);
        for key in 0..10u32 {
            tree.insert(key);
        }
        let before: Vec<NodeId> = tree.traverse().map(|entry| entry.node).collect();

        tree.clear();
        assert!(tree.is_empty());
        tree.validate_invariants();

        tree.insert(1);
        let after = tree.traverse().next().map(|entry| entry.node).expect("root exists");
        assert!(before.iter().all(|&id| id < after));
    }

    // ─────────────────────────── property tests ───────────────────────────

    #[derive(Clone, Debug)]
    enum Operation {
        Insert(u8),
        Remove(u8),
        Contains(u8),
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            4 => any::<u8>().prop_map(Operation::Insert),
            3 => any::<u8>().prop_map(Operation::Remove),
            1 => any::<u8>().prop_map(Operation::Contains),
        ]
    }

    proptest! {
        #[test]
        fn tree_behaves_like_btreeset(
            order in 2usize..=5,
            operations in prop::collection::vec(strategy(), 0..512),
        ) {
            let mut model: BTreeSet<u8> = BTreeSet::new();
            let mut tree: RawBTree<u8> = RawBTree::new(order);

            for operation in operations {
                match operation {
                    Operation::Insert(key) => {
                        prop_assert_eq!(tree.insert(key), model.insert(key));
                    }
                    Operation::Remove(key) => {
                        prop_assert_eq!(tree.remove(&key), model.remove(&key));
                    }
                    Operation::Contains(key) => {
                        prop_assert_eq!(tree.find(&key).is_some(), model.contains(&key));
                    }
                }

                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }

            let keys: Vec<u8> = tree.iter().copied().collect();
            let expected: Vec<u8> = model.iter().copied().collect();
            prop_assert_eq!(keys, expected);
        }

        #[test]
        fn update_preserves_invariants(
            keys in prop::collection::btree_set(any::<u16>(), 1..64),
            pick in any::<prop::sample::Index>(),
            replacement in any::<u16>(),
        ) {
            let mut tree: RawBTree<u16> = RawBTree::new(2);
            for &key in &keys {
                tree.insert(key);
            }

            let ordered: Vec<u16> = keys.iter().copied().collect();
            let old = ordered[pick.index(ordered.len())];

            match tree.update(&old, replacement) {
                Ok(()) => {
                    prop_assert!(tree.find(&replacement).is_some());
                }
                Err(Error::UpdateOutOfOrder) => {
                    prop_assert!(tree.find(&old).is_some());
                }
                Err(error) => prop_assert!(false, "unexpected error: {}", error),
            }

            tree.validate_invariants();
            prop_assert_eq!(tree.len(), keys.len());
        }
    }
}
