//! The node table and its mutation rules.
//!
//! [`ScopeTable`] is a plain two-level map (`scope -> id -> payload`) with no
//! locking and no I/O. Backends validate a mutation with
//! [`check_write`](ScopeTable::check_write) or
//! [`check_delete`](ScopeTable::check_delete), persist it if they persist
//! anything, then [`apply`](ScopeTable::apply) it.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use gpps_types::{is_sentinel, Namespace, Node, NodeId, Requester, SENTINEL_NODE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::policy::LockPolicy;

/// An accepted change to the node table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Create or fully replace a node.
    Set {
        namespace: Namespace,
        id: NodeId,
        data: Vec<u8>,
    },
    /// Remove a node.
    Delete { namespace: Namespace, id: NodeId },
}

impl Mutation {
    pub fn namespace(&self) -> &Namespace {
        match self {
            Self::Set { namespace, .. } | Self::Delete { namespace, .. } => namespace,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Self::Set { id, .. } | Self::Delete { id, .. } => *id,
        }
    }
}

/// Whether a write allocated a new node or replaced an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Created,
    Replaced,
}

/// Two-level node table: scope, then node id.
///
/// Scopes with no nodes are never present in the outer map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeTable {
    scopes: BTreeMap<Namespace, BTreeMap<NodeId, Vec<u8>>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &Namespace, id: NodeId) -> Option<&[u8]> {
        self.scopes
            .get(namespace)
            .and_then(|nodes| nodes.get(&id))
            .map(Vec::as_slice)
    }

    pub fn contains(&self, namespace: &Namespace, id: NodeId) -> bool {
        self.get(namespace, id).is_some()
    }

    /// Whether node 0 of `namespace` currently holds the sentinel.
    pub fn is_immutable(&self, namespace: &Namespace) -> bool {
        self.get(namespace, SENTINEL_NODE).is_some_and(is_sentinel)
    }

    /// Validate a write without applying it.
    pub fn check_write(
        &self,
        policy: LockPolicy,
        namespace: &Namespace,
        id: NodeId,
        requester: &Requester,
    ) -> StoreResult<WriteOutcome> {
        authorize(namespace, requester)?;

        let outcome = if self.contains(namespace, id) {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Created
        };

        let guarded = outcome == WriteOutcome::Replaced || policy.guards_creation();
        if guarded && self.is_immutable(namespace) {
            warn!(namespace = %namespace, id, "write rejected: immutable scope");
            return Err(StoreError::ImmutableScope(namespace.clone()));
        }
        Ok(outcome)
    }

    /// Validate a delete without applying it.
    ///
    /// A missing node is reported before a frozen scope.
    pub fn check_delete(
        &self,
        namespace: &Namespace,
        id: NodeId,
        requester: &Requester,
    ) -> StoreResult<()> {
        authorize(namespace, requester)?;

        if !self.contains(namespace, id) {
            return Err(StoreError::NotFound {
                namespace: namespace.clone(),
                id,
            });
        }
        if self.is_immutable(namespace) {
            warn!(namespace = %namespace, id, "delete rejected: immutable scope");
            return Err(StoreError::ImmutableScope(namespace.clone()));
        }
        Ok(())
    }

    /// Apply a mutation unconditionally.
    ///
    /// Returns `true` if this mutation locked its scope.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Set {
                namespace,
                id,
                data,
            } => {
                let locks =
                    id == SENTINEL_NODE && is_sentinel(&data) && !self.is_immutable(&namespace);
                self.scopes.entry(namespace).or_default().insert(id, data);
                locks
            }
            Mutation::Delete { namespace, id } => {
                if let Some(nodes) = self.scopes.get_mut(&namespace) {
                    nodes.remove(&id);
                    if nodes.is_empty() {
                        self.scopes.remove(&namespace);
                    }
                }
                false
            }
        }
    }

    /// Nodes of `namespace` with ids in `range`, ascending, at most `limit`.
    pub fn rows(
        &self,
        namespace: &Namespace,
        range: RangeInclusive<NodeId>,
        limit: Option<usize>,
    ) -> Vec<Node> {
        if range.start() > range.end() {
            return Vec::new();
        }
        let Some(nodes) = self.scopes.get(namespace) else {
            return Vec::new();
        };
        nodes
            .range(range)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, data)| Node::new(*id, data.clone()))
            .collect()
    }

    /// All non-empty scopes, ascending.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.scopes.keys().cloned().collect()
    }

    /// Number of nodes and payload bytes held by `namespace`.
    pub fn usage(&self, namespace: &Namespace) -> (usize, u64) {
        self.scopes.get(namespace).map_or((0, 0), |nodes| {
            let bytes = nodes.values().map(|d| d.len() as u64).sum();
            (nodes.len(), bytes)
        })
    }

    /// Every live node as a `Set` mutation, in key order.
    pub fn snapshot(&self) -> Vec<Mutation> {
        self.scopes
            .iter()
            .flat_map(|(namespace, nodes)| {
                nodes.iter().map(move |(id, data)| Mutation::Set {
                    namespace: namespace.clone(),
                    id: *id,
                    data: data.clone(),
                })
            })
            .collect()
    }

    /// Total number of nodes across all scopes.
    pub fn node_count(&self) -> usize {
        self.scopes.values().map(BTreeMap::len).sum()
    }
}

fn authorize(namespace: &Namespace, requester: &Requester) -> StoreResult<()> {
    if requester.acts_for(namespace) {
        Ok(())
    } else {
        warn!(requester = %requester, namespace = %namespace, "mutation rejected: unauthorized");
        Err(StoreError::Unauthorized {
            requester: requester.account().clone(),
            namespace: namespace.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpps_types::IMMUTABLE_SENTINEL;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    fn owner(name: &str) -> Requester {
        Requester::new(ns(name))
    }

    fn set(name: &str, id: NodeId, data: &[u8]) -> Mutation {
        Mutation::Set {
            namespace: ns(name),
            id,
            data: data.to_vec(),
        }
    }

    #[test]
    fn check_write_reports_created_then_replaced() {
        let mut table = ScopeTable::new();
        let alice = ns("alice");
        let outcome = table
            .check_write(LockPolicy::Strict, &alice, 1, &owner("alice"))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Created);

        table.apply(set("alice", 1, b"x"));
        let outcome = table
            .check_write(LockPolicy::Strict, &alice, 1, &owner("alice"))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Replaced);
    }

    #[test]
    fn foreign_requester_is_unauthorized() {
        let table = ScopeTable::new();
        let err = table
            .check_write(LockPolicy::Strict, &ns("alice"), 1, &owner("bob"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { .. }));

        let err = table.check_delete(&ns("alice"), 1, &owner("bob")).unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { .. }));
    }

    #[test]
    fn apply_reports_lock_transition_once() {
        let mut table = ScopeTable::new();
        assert!(table.apply(set("alice", 0, &IMMUTABLE_SENTINEL)));
        assert!(table.is_immutable(&ns("alice")));
        // Replaying the same record on a locked scope is not a new transition.
        assert!(!table.apply(set("alice", 0, &IMMUTABLE_SENTINEL)));
    }

    #[test]
    fn delete_of_last_node_drops_scope() {
        let mut table = ScopeTable::new();
        table.apply(set("alice", 3, b"only"));
        assert_eq!(table.namespaces(), vec![ns("alice")]);

        table.apply(Mutation::Delete {
            namespace: ns("alice"),
            id: 3,
        });
        assert!(table.namespaces().is_empty());
        assert_eq!(table, ScopeTable::new());
    }

    #[test]
    fn delete_checks_existence_before_lock() {
        let mut table = ScopeTable::new();
        table.apply(set("alice", 0, &IMMUTABLE_SENTINEL));
        let err = table.check_delete(&ns("alice"), 9, &owner("alice")).unwrap_err();
        assert!(err.is_not_found());
        let err = table.check_delete(&ns("alice"), 0, &owner("alice")).unwrap_err();
        assert!(err.is_immutable_scope());
    }

    #[test]
    fn rows_respects_bounds_and_limit() {
        let mut table = ScopeTable::new();
        for id in 0..10 {
            table.apply(set("alice", id, &[id as u8]));
        }
        let rows = table.rows(&ns("alice"), 2..=5, None);
        let ids: Vec<NodeId> = rows.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3, 4, 5]);

        let rows = table.rows(&ns("alice"), 0..=NodeId::MAX, Some(3));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], Node::new(2, vec![2]));
    }

    #[test]
    fn rows_with_inverted_range_is_empty() {
        let mut table = ScopeTable::new();
        table.apply(set("alice", 1, b"a"));
        #[allow(clippy::reversed_empty_ranges)]
        let rows = table.rows(&ns("alice"), 5..=1, None);
        assert!(rows.is_empty());
        assert!(table.rows(&ns("bob"), 0..=10, None).is_empty());
    }

    #[test]
    fn usage_and_snapshot() {
        let mut table = ScopeTable::new();
        table.apply(set("alice", 1, b"abc"));
        table.apply(set("alice", 2, b""));
        table.apply(set("bob", 1, b"zz"));

        assert_eq!(table.usage(&ns("alice")), (2, 3));
        assert_eq!(table.usage(&ns("carol")), (0, 0));
        assert_eq!(table.node_count(), 3);

        let mut rebuilt = ScopeTable::new();
        for m in table.snapshot() {
            rebuilt.apply(m);
        }
        assert_eq!(rebuilt, table);
    }
}
