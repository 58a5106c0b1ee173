use std::path::PathBuf;

use gpps_types::{Namespace, NodeId};

/// Errors from node table operations.
///
/// Every error is terminal for the call that produced it; nothing is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requester does not own the scope it tried to mutate.
    #[error("{requester} is not authorized to act for scope {namespace}")]
    Unauthorized {
        requester: Namespace,
        namespace: Namespace,
    },

    /// The scope's node 0 holds the immutability sentinel.
    #[error("immutable scope: {0}")]
    ImmutableScope(Namespace),

    /// No node with this id exists in the scope.
    #[error("node {id} does not exist in scope {namespace}")]
    NotFound { namespace: Namespace, id: NodeId },

    /// I/O error from the journal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The journal holds a damaged entry that valid entries follow.
    #[error("corrupt journal {} at offset {offset}: {reason}", path.display())]
    CorruptJournal {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A thread panicked while holding a store lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Whether this error reports a missing node.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error reports a frozen scope.
    pub fn is_immutable_scope(&self) -> bool {
        matches!(self, Self::ImmutableScope(_))
    }

    pub fn is_corrupt_journal(&self) -> bool {
        matches!(self, Self::CorruptJournal { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}
