//! Read-only Graphviz rendering of a [`BTreeIndex`].
//!
//! This module only formats: it walks the index through its public traversal
//! and produces a DOT document as a `String`. It performs no I/O and cannot
//! mutate the tree. Feed the output to `dot -Tpng` (or any Graphviz consumer)
//! to draw the tree.

use core::fmt::Display;

use crate::index::BTreeIndex;

/// Renders the index as a Graphviz DOT digraph.
///
/// Every node becomes a record-shaped DOT node named after its
/// [`NodeId`](crate::NodeId) and labeled with its keys (`"5 | 10 | 15"`);
/// every parent link becomes an edge. Keys are rendered with their
/// [`Display`] impl, which must not produce characters that are special
/// inside a double-quoted DOT string.
///
/// # Examples
///
/// ```
/// use koji_tree::{dot, BTreeIndex};
///
/// let mut index = BTreeIndex::new(2)?;
/// for key in [2, 1, 3] {
///     index.insert(key)?;
/// }
///
/// let rendered = dot::to_dot(&index);
/// assert!(rendered.starts_with("digraph btree {"));
/// assert!(rendered.contains("[label=\"1 | 2 | 3\"]"));
/// # Ok::<(), koji_tree::Error>(())
/// ```
#[must_use]
pub fn to_dot<K: Display>(index: &BTreeIndex<K>) -> String {
    let mut out = String::from("digraph btree {\n    node [shape=record];\n");

    for entry in index.traverse() {
        let mut label = String::new();
        for (position, key) in entry.keys.iter().enumerate() {
            if position > 0 {
                label.push_str(" | ");
            }
            label.push_str(&key.to_string());
        }

        out.push_str(&format!("    n{} [label=\"{label}\"];\n", entry.node));
        if let Some(parent) = entry.parent {
            out.push_str(&format!("    n{parent} -> n{};\n", entry.node));
        }
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_renders_one_empty_node() {
        let index: BTreeIndex<u32> = BTreeIndex::new(2).unwrap();
        let rendered = to_dot(&index);

        assert!(rendered.starts_with("digraph btree {\n"));
        assert!(rendered.ends_with("}\n"));
        assert!(rendered.contains("[label=\"\"]"));
        assert!(!rendered.contains("->"));
    }

    #[test]
    fn multi_level_tree_renders_all_edges() {
        let mut index = BTreeIndex::new(2).unwrap();
        for key in 1..=7u32 {
            index.insert(key).unwrap();
        }

        let rendered = to_dot(&index);
        let nodes = index.traverse().count();
        let edges = nodes - 1;

        assert_eq!(rendered.matches("[label=").count(), nodes);
        assert_eq!(rendered.matches("->").count(), edges);

        // Every edge references its parent by stable id.
        for entry in index.traverse() {
            if let Some(parent) = entry.parent {
                assert!(rendered.contains(&format!("n{parent} -> n{};", entry.node)));
            }
        }
    }
}
