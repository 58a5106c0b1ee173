use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a node within its scope.
pub type NodeId = u64;

/// The node whose payload decides whether a scope is immutable.
pub const SENTINEL_NODE: NodeId = 0;

/// Payload that, stored at [`SENTINEL_NODE`], permanently freezes a scope.
pub const IMMUTABLE_SENTINEL: [u8; 2] = [0xDE, 0xAD];

/// Returns `true` if `data` is exactly the immutability sentinel.
///
/// Length matters: `[0xDE]` and `[0xDE, 0xAD, 0x00]` are ordinary payloads.
pub fn is_sentinel(data: &[u8]) -> bool {
    data == IMMUTABLE_SENTINEL
}

/// The atomic stored unit: an id and an opaque payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub data: Vec<u8>,
}

impl Node {
    pub fn new(id: NodeId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether this node, if stored, locks its scope.
    pub fn is_lock_marker(&self) -> bool {
        self.id == SENTINEL_NODE && is_sentinel(&self.data)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = &self.data[..self.data.len().min(8)];
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("len", &self.data.len())
            .field("head", &hex::encode(preview))
            .finish()
    }
}
