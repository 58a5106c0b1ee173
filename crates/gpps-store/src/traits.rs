use std::ops::RangeInclusive;

use gpps_types::{Namespace, Node, NodeId, Requester};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::table::WriteOutcome;

/// Summary of one scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeStats {
    /// Number of nodes in the scope.
    pub nodes: usize,
    /// Sum of payload lengths.
    pub bytes: u64,
    /// Whether node 0 holds the immutability sentinel.
    pub immutable: bool,
}

/// Scoped node table.
///
/// All implementations must satisfy these invariants:
/// - Node ids are unique within a scope; a write fully replaces the payload.
/// - Only the requester that owns a scope may mutate it.
/// - Once node 0 of a scope holds `0xDEAD`, writes and deletes against that
///   scope fail with `ImmutableScope`. There is no unlock.
/// - Reads need no authorization and never mutate state.
/// - An absent scope behaves exactly like an empty one.
pub trait ScopedBlobStore: Send + Sync {
    /// Create or replace node `id` in `namespace`.
    fn write(
        &self,
        namespace: &Namespace,
        id: NodeId,
        data: &[u8],
        requester: &Requester,
    ) -> StoreResult<WriteOutcome>;

    /// Remove node `id` from `namespace`.
    ///
    /// Returns `Err(NotFound)` if the node does not exist.
    fn delete(&self, namespace: &Namespace, id: NodeId, requester: &Requester) -> StoreResult<()>;

    /// Read the payload of node `id`.
    ///
    /// Returns `Err(NotFound)` if the node does not exist.
    fn read(&self, namespace: &Namespace, id: NodeId) -> StoreResult<Vec<u8>>;

    /// Whether `namespace` is locked. Evaluated from current node-0 content.
    fn is_immutable(&self, namespace: &Namespace) -> StoreResult<bool>;

    /// Nodes with ids in `range`, ascending, at most `limit` of them.
    fn rows(
        &self,
        namespace: &Namespace,
        range: RangeInclusive<NodeId>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Node>>;

    /// All scopes holding at least one node, ascending.
    fn namespaces(&self) -> StoreResult<Vec<Namespace>>;

    /// Check whether a node exists.
    fn contains(&self, namespace: &Namespace, id: NodeId) -> StoreResult<bool> {
        match self.read(namespace, id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All node ids of a scope, ascending.
    fn node_ids(&self, namespace: &Namespace) -> StoreResult<Vec<NodeId>> {
        let rows = self.rows(namespace, 0..=NodeId::MAX, None)?;
        Ok(rows.into_iter().map(|node| node.id).collect())
    }

    /// Node count, byte total and lock state of a scope.
    ///
    /// Default implementation scans the scope. Backends may override.
    fn stats(&self, namespace: &Namespace) -> StoreResult<ScopeStats> {
        let rows = self.rows(namespace, 0..=NodeId::MAX, None)?;
        Ok(ScopeStats {
            nodes: rows.len(),
            bytes: rows.iter().map(|node| node.len() as u64).sum(),
            immutable: self.is_immutable(namespace)?,
        })
    }
}
