use thiserror::Error;

/// Errors returned by the public index operations.
///
/// Every error leaves the tree exactly as it was before the call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested branching parameter is below the classic minimum of 2.
    #[error("invalid B-tree order {0}: order must be at least 2")]
    InvalidOrder(usize),

    /// The key targeted by an update is not in the index.
    #[error("key not found")]
    KeyNotFound,

    /// The inserted key is already in the index.
    #[error("duplicate key")]
    DuplicateKey,

    /// The replacement key falls outside the located key's enclosing
    /// interval, so writing it in place would break the sorted order.
    #[error("replacement key would violate key ordering")]
    UpdateOutOfOrder,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::InvalidOrder(1).to_string(),
            "invalid B-tree order 1: order must be at least 2"
        );
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(Error::DuplicateKey.to_string(), "duplicate key");
        assert_eq!(
            Error::UpdateOutOfOrder.to_string(),
            "replacement key would violate key ordering"
        );
    }
}
