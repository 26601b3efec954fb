mod arena;
mod node;
mod raw_btree;

pub use node::NodeId;

pub(crate) use raw_btree::{RawBTree, RawIter, RawTraverse, RawTraverseEntry};
