use serde::{Deserialize, Serialize};

/// How far the immutability latch reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockPolicy {
    /// A locked scope rejects every write and delete, including writes that
    /// would create a node id not yet present.
    #[default]
    Strict,
    /// A locked scope freezes existing nodes only. New ids can still be
    /// created after the lock; deployed data written under this rule may
    /// depend on it.
    Legacy,
}

impl LockPolicy {
    /// Whether creating a fresh node id is blocked in a locked scope.
    pub fn guards_creation(self) -> bool {
        matches!(self, Self::Strict)
    }
}
