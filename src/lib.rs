//! A classic in-memory B-tree index for Rust.
//!
//! This crate provides [`BTreeIndex`], a balanced multi-way search tree over a
//! single orderable key type. Unlike the standard library's `BTreeSet`, the
//! branching parameter (the classic B-tree *order* `t`) is chosen at
//! construction time, and every node carries a stable [`NodeId`] so external
//! tooling can inspect the tree's shape through a read-only traversal.
//!
//! Every node holds between `order - 1` and `2 * order - 1` keys (the root is
//! exempt from the lower bound) and all leaves sit at the same depth. Inserts
//! split full nodes top-down on the way to the leaf; deletes restore minimum
//! occupancy by borrowing from or merging with siblings on the way down.
//!
//! # Example
//!
//! ```
//! use koji_tree::BTreeIndex;
//!
//! let mut index = BTreeIndex::new(2)?;
//! for key in [10, 20, 5, 6, 12, 30, 7, 17, 4, 15, 1] {
//!     index.insert(key)?;
//! }
//!
//! assert_eq!(index.len(), 11);
//! assert!(index.find(&15).is_some());
//! assert!(index.find(&99).is_none());
//!
//! index.remove(&6);
//! let keys: Vec<i32> = index.iter().copied().collect();
//! assert_eq!(keys, [1, 4, 5, 7, 10, 12, 15, 17, 20, 30]);
//! # Ok::<(), koji_tree::Error>(())
//! ```
//!
//! # Inspecting the tree
//!
//! [`BTreeIndex::traverse`] yields one entry per node in pre-order, carrying
//! the node's [`NodeId`], its parent's id, its depth, and its keys. The
//! [`dot`] module renders that traversal as a Graphviz document.

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]

mod error;
mod raw;

pub mod dot;
pub mod index;

pub use error::{Error, Result};
pub use index::BTreeIndex;
pub use raw::NodeId;
