use std::ops::RangeInclusive;
use std::sync::RwLock;

use gpps_types::{Namespace, Node, NodeId, Requester};
use tracing::{debug, info};

use crate::error::{poisoned, StoreError, StoreResult};
use crate::policy::LockPolicy;
use crate::table::{Mutation, ScopeTable, WriteOutcome};
use crate::traits::{ScopeStats, ScopedBlobStore};

/// In-memory node table.
///
/// Intended for tests and embedding. The whole table sits behind one
/// `RwLock`: writes and deletes are exclusive, reads are shared. Payloads are
/// cloned on read and write.
pub struct InMemoryScopedStore {
    table: RwLock<ScopeTable>,
    policy: LockPolicy,
}

impl InMemoryScopedStore {
    /// Create a new empty store with the strict lock policy.
    pub fn new() -> Self {
        Self::with_policy(LockPolicy::default())
    }

    pub fn with_policy(policy: LockPolicy) -> Self {
        Self {
            table: RwLock::new(ScopeTable::new()),
            policy,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Total number of nodes across all scopes.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.table.read().map_err(poisoned)?.node_count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryScopedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedBlobStore for InMemoryScopedStore {
    fn write(
        &self,
        namespace: &Namespace,
        id: NodeId,
        data: &[u8],
        requester: &Requester,
    ) -> StoreResult<WriteOutcome> {
        let mut table = self.table.write().map_err(poisoned)?;
        let outcome = table.check_write(self.policy, namespace, id, requester)?;
        let locked = table.apply(Mutation::Set {
            namespace: namespace.clone(),
            id,
            data: data.to_vec(),
        });
        debug!(namespace = %namespace, id, len = data.len(), ?outcome, "node written");
        if locked {
            info!(namespace = %namespace, "scope is now immutable");
        }
        Ok(outcome)
    }

    fn delete(&self, namespace: &Namespace, id: NodeId, requester: &Requester) -> StoreResult<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.check_delete(namespace, id, requester)?;
        table.apply(Mutation::Delete {
            namespace: namespace.clone(),
            id,
        });
        debug!(namespace = %namespace, id, "node deleted");
        Ok(())
    }

    fn read(&self, namespace: &Namespace, id: NodeId) -> StoreResult<Vec<u8>> {
        let table = self.table.read().map_err(poisoned)?;
        table
            .get(namespace, id)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| StoreError::NotFound {
                namespace: namespace.clone(),
                id,
            })
    }

    fn is_immutable(&self, namespace: &Namespace) -> StoreResult<bool> {
        Ok(self.table.read().map_err(poisoned)?.is_immutable(namespace))
    }

    fn rows(
        &self,
        namespace: &Namespace,
        range: RangeInclusive<NodeId>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Node>> {
        Ok(self.table.read().map_err(poisoned)?.rows(namespace, range, limit))
    }

    fn namespaces(&self) -> StoreResult<Vec<Namespace>> {
        Ok(self.table.read().map_err(poisoned)?.namespaces())
    }

    fn contains(&self, namespace: &Namespace, id: NodeId) -> StoreResult<bool> {
        Ok(self.table.read().map_err(poisoned)?.contains(namespace, id))
    }

    fn stats(&self, namespace: &Namespace) -> StoreResult<ScopeStats> {
        let table = self.table.read().map_err(poisoned)?;
        let (nodes, bytes) = table.usage(namespace);
        Ok(ScopeStats {
            nodes,
            bytes,
            immutable: table.is_immutable(namespace),
        })
    }
}

impl std::fmt::Debug for InMemoryScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or(0);
        f.debug_struct("InMemoryScopedStore")
            .field("node_count", &count)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpps_types::IMMUTABLE_SENTINEL;
    use proptest::prelude::*;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    fn owner(name: &str) -> Requester {
        Requester::new(ns(name))
    }

    fn lock(store: &InMemoryScopedStore, name: &str) {
        store
            .write(&ns(name), 0, &IMMUTABLE_SENTINEL, &owner(name))
            .unwrap();
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn write_then_read() {
        let store = InMemoryScopedStore::new();
        let outcome = store
            .write(&ns("alice"), 1, b"hello world", &owner("alice"))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        assert_eq!(store.read(&ns("alice"), 1).unwrap(), b"hello world");
    }

    #[test]
    fn overwrite_replaces_payload() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 4, b"a much longer payload", &owner("alice")).unwrap();
        let outcome = store.write(&alice, 4, b"short", &owner("alice")).unwrap();
        assert_eq!(outcome, WriteOutcome::Replaced);
        assert_eq!(store.read(&alice, 4).unwrap(), b"short");

        store.write(&alice, 4, b"grown back out again", &owner("alice")).unwrap();
        assert_eq!(store.read(&alice, 4).unwrap(), b"grown back out again");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn empty_payload_is_a_node() {
        let store = InMemoryScopedStore::new();
        store.write(&ns("alice"), 2, &[], &owner("alice")).unwrap();
        assert_eq!(store.read(&ns("alice"), 2).unwrap(), Vec::<u8>::new());
        assert!(store.contains(&ns("alice"), 2).unwrap());
    }

    #[test]
    fn delete_removes_node() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 1, b"x", &owner("alice")).unwrap();
        store.delete(&alice, 1, &owner("alice")).unwrap();
        let err = store.read(&alice, 1).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_missing_node_is_not_found() {
        let store = InMemoryScopedStore::new();
        let err = store.delete(&ns("alice"), 1, &owner("alice")).unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { id: 1, .. }),
            "expected NotFound, got: {err}"
        );
    }

    #[test]
    fn read_missing_node_is_not_found() {
        let store = InMemoryScopedStore::new();
        assert!(store.read(&ns("nobody"), 0).unwrap_err().is_not_found());
    }

    #[test]
    fn scope_vanishes_with_last_node() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 1, b"a", &owner("alice")).unwrap();
        store.write(&alice, 2, b"b", &owner("alice")).unwrap();
        assert_eq!(store.namespaces().unwrap(), vec![alice.clone()]);

        store.delete(&alice, 1, &owner("alice")).unwrap();
        store.delete(&alice, 2, &owner("alice")).unwrap();
        assert!(store.namespaces().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
        assert_eq!(store.stats(&alice).unwrap(), ScopeStats::default());
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    #[test]
    fn only_owner_may_mutate() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        let err = store.write(&alice, 1, b"x", &owner("mallory")).unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { .. }));
        assert!(store.is_empty().unwrap());

        store.write(&alice, 1, b"x", &owner("alice")).unwrap();
        let err = store.delete(&alice, 1, &owner("mallory")).unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized { .. }));
        assert_eq!(store.read(&alice, 1).unwrap(), b"x");
    }

    // -----------------------------------------------------------------------
    // Immutability latch
    // -----------------------------------------------------------------------

    #[test]
    fn sentinel_locks_every_node() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 5, b"existing", &owner("alice")).unwrap();
        lock(&store, "alice");
        assert!(store.is_immutable(&alice).unwrap());

        for id in [0, 5, 6, NodeId::MAX] {
            let err = store.write(&alice, id, b"again", &owner("alice")).unwrap_err();
            assert!(err.is_immutable_scope(), "write {id}: {err}");
        }
        for id in [0, 5] {
            let err = store.delete(&alice, id, &owner("alice")).unwrap_err();
            assert!(err.is_immutable_scope(), "delete {id}: {err}");
        }

        assert_eq!(store.read(&alice, 5).unwrap(), b"existing");
        assert!(!store.contains(&alice, 6).unwrap());
    }

    #[test]
    fn rewriting_sentinel_is_rejected() {
        let store = InMemoryScopedStore::new();
        lock(&store, "alice");
        let err = store
            .write(&ns("alice"), 0, &IMMUTABLE_SENTINEL, &owner("alice"))
            .unwrap_err();
        assert!(err.is_immutable_scope());
    }

    #[test]
    fn sentinel_specificity() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        let lookalikes: [&[u8]; 5] = [
            &[0xDE],
            &[0xDE, 0xAD, 0x00],
            &[0xAD, 0xDE],
            &[],
            &[0xDE, 0xAE],
        ];
        for payload in lookalikes {
            store.write(&alice, 0, payload, &owner("alice")).unwrap();
            assert!(!store.is_immutable(&alice).unwrap(), "{payload:?} locked the scope");
        }
    }

    #[test]
    fn sentinel_elsewhere_is_ordinary() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 1, &IMMUTABLE_SENTINEL, &owner("alice")).unwrap();
        assert!(!store.is_immutable(&alice).unwrap());
        store.delete(&alice, 1, &owner("alice")).unwrap();
    }

    #[test]
    fn node_zero_is_ordinary_before_lock() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        store.write(&alice, 0, b"header", &owner("alice")).unwrap();
        assert_eq!(store.read(&alice, 0).unwrap(), b"header");
        store.delete(&alice, 0, &owner("alice")).unwrap();
        assert!(!store.contains(&alice, 0).unwrap());
    }

    #[test]
    fn lock_is_per_scope() {
        let store = InMemoryScopedStore::new();
        lock(&store, "alice");
        assert!(!store.is_immutable(&ns("bob")).unwrap());
        store.write(&ns("bob"), 1, b"free", &owner("bob")).unwrap();
        store.delete(&ns("bob"), 1, &owner("bob")).unwrap();
    }

    #[test]
    fn legacy_policy_allows_new_ids_after_lock() {
        let store = InMemoryScopedStore::with_policy(LockPolicy::Legacy);
        let alice = ns("alice");
        store.write(&alice, 1, b"frozen", &owner("alice")).unwrap();
        lock(&store, "alice");

        let err = store.write(&alice, 1, b"changed", &owner("alice")).unwrap_err();
        assert!(err.is_immutable_scope());

        let outcome = store.write(&alice, 2, b"appended", &owner("alice")).unwrap();
        assert_eq!(outcome, WriteOutcome::Created);

        // Once created, the new node is frozen like the rest.
        let err = store.write(&alice, 2, b"changed", &owner("alice")).unwrap_err();
        assert!(err.is_immutable_scope());
        let err = store.delete(&alice, 2, &owner("alice")).unwrap_err();
        assert!(err.is_immutable_scope());
    }

    // -----------------------------------------------------------------------
    // Concrete scenario
    // -----------------------------------------------------------------------

    #[test]
    fn alice_scenario() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        let me = owner("alice");

        store.write(&alice, 1, &[0x01, 0x02, 0x03], &me).unwrap();
        assert_eq!(store.read(&alice, 1).unwrap(), vec![0x01, 0x02, 0x03]);

        store.write(&alice, 2, &[], &me).unwrap();
        assert_eq!(store.read(&alice, 2).unwrap(), Vec::<u8>::new());

        store.write(&alice, 0, &[0xDE, 0xAD], &me).unwrap();
        assert!(store.is_immutable(&alice).unwrap());

        let err = store.delete(&alice, 1, &me).unwrap_err();
        assert!(matches!(err, StoreError::ImmutableScope(ref n) if n == &alice));
        assert_eq!(store.read(&alice, 1).unwrap(), vec![0x01, 0x02, 0x03]);

        let stats = store.stats(&alice).unwrap();
        assert_eq!(
            stats,
            ScopeStats {
                nodes: 3,
                bytes: 5,
                immutable: true
            }
        );
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn rows_and_node_ids() {
        let store = InMemoryScopedStore::new();
        let alice = ns("alice");
        for id in [9, 1, 5, 3] {
            store.write(&alice, id, &[id as u8], &owner("alice")).unwrap();
        }
        assert_eq!(store.node_ids(&alice).unwrap(), vec![1, 3, 5, 9]);

        let rows = store.rows(&alice, 3..=5, None).unwrap();
        assert_eq!(rows, vec![Node::new(3, vec![3]), Node::new(5, vec![5])]);

        let rows = store.rows(&alice, 0..=NodeId::MAX, Some(1)).unwrap();
        assert_eq!(rows, vec![Node::new(1, vec![1])]);
    }

    #[test]
    fn namespaces_are_sorted() {
        let store = InMemoryScopedStore::new();
        for name in ["carol", "alice", "bob"] {
            store.write(&ns(name), 1, b"x", &owner(name)).unwrap();
        }
        assert_eq!(
            store.namespaces().unwrap(),
            vec![ns("alice"), ns("bob"), ns("carol")]
        );
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writers_on_distinct_scopes() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryScopedStore::new());
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];

        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let store = Arc::clone(&store);
                let name = name.to_string();
                thread::spawn(move || {
                    for id in 0..50u64 {
                        store
                            .write(&ns(&name), id + 1, &id.to_le_bytes(), &owner(&name))
                            .unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(store.len().unwrap(), names.len() * 50);
        assert_eq!(store.read(&ns("c"), 50).unwrap(), 49u64.to_le_bytes());
    }

    #[test]
    fn debug_format() {
        let store = InMemoryScopedStore::new();
        store.write(&ns("alice"), 1, b"x", &owner("alice")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryScopedStore"));
        assert!(debug.contains("node_count: 1"));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn scope_name() -> impl Strategy<Value = Namespace> {
        "[a-z1-5]{1,12}".prop_map(|s| Namespace::new(s).unwrap())
    }

    fn payload() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..64)
    }

    proptest! {
        #[test]
        fn prop_write_then_read(n in scope_name(), id in any::<u64>(), p in payload()) {
            let store = InMemoryScopedStore::new();
            store.write(&n, id, &p, &Requester::new(n.clone())).unwrap();
            prop_assert_eq!(store.read(&n, id).unwrap(), p);
        }

        #[test]
        fn prop_overwrite_replaces(
            n in scope_name(),
            id in 1u64..,
            p1 in payload(),
            p2 in payload(),
        ) {
            let store = InMemoryScopedStore::new();
            let me = Requester::new(n.clone());
            store.write(&n, id, &p1, &me).unwrap();
            store.write(&n, id, &p2, &me).unwrap();
            prop_assert_eq!(store.read(&n, id).unwrap(), p2);
        }

        #[test]
        fn prop_scopes_are_isolated(
            n1 in scope_name(),
            n2 in scope_name(),
            id in any::<u64>(),
            p1 in payload(),
            p2 in payload(),
        ) {
            prop_assume!(n1 != n2);
            let store = InMemoryScopedStore::new();
            store.write(&n1, id, &p1, &Requester::new(n1.clone())).unwrap();
            prop_assert!(store.read(&n2, id).unwrap_err().is_not_found());

            store.write(&n2, id, &p2, &Requester::new(n2.clone())).unwrap();
            store.delete(&n2, id, &Requester::new(n2.clone())).unwrap();
            prop_assert_eq!(store.read(&n1, id).unwrap(), p1);
        }

        #[test]
        fn prop_only_exact_sentinel_locks(p in payload()) {
            let store = InMemoryScopedStore::new();
            let n = Namespace::new("alice").unwrap();
            store.write(&n, 0, &p, &Requester::new(n.clone())).unwrap();
            prop_assert_eq!(store.is_immutable(&n).unwrap(), p == [0xDE, 0xAD]);
        }
    }
}
