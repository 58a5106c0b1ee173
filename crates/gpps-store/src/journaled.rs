use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::RwLock;

use gpps_types::{Namespace, Node, NodeId, Requester};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{poisoned, StoreError, StoreResult};
use crate::journal::Journal;
use crate::policy::LockPolicy;
use crate::table::{Mutation, ScopeTable, WriteOutcome};
use crate::traits::{ScopeStats, ScopedBlobStore};

/// Durable node table.
///
/// State lives in memory and is rebuilt on [`open`](Self::open) by replaying
/// the journal in `<data_dir>/nodes.journal`. Each write or delete is
/// validated, appended to the journal, and only then applied, all under the
/// table's exclusive lock. A mutation that fails validation or fails to reach
/// the journal does not change state.
///
/// Opening refuses a journal with a damaged entry in the middle
/// ([`StoreError::CorruptJournal`]) instead of replaying around it, since a
/// skipped entry could be a delete or the lock itself. Only a torn final entry
/// is dropped.
pub struct JournaledStore {
    table: RwLock<ScopeTable>,
    journal: Journal,
    policy: LockPolicy,
}

impl JournaledStore {
    /// File name of the journal inside the data directory.
    pub const JOURNAL_FILE: &'static str = "nodes.journal";

    /// Open the store described by `config`, replaying its journal.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let path = config.data_dir.join(Self::JOURNAL_FILE);
        let journal = Journal::open(&path, config.sync_mode)?;

        let mut table = ScopeTable::new();
        let mut replayed = 0usize;
        for mutation in journal.recover()? {
            table.apply(mutation);
            replayed += 1;
        }

        info!(
            path = %path.display(),
            replayed,
            nodes = table.node_count(),
            policy = ?config.lock_policy,
            "journaled store opened"
        );

        Ok(Self {
            table: RwLock::new(table),
            journal,
            policy: config.lock_policy,
        })
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    /// Rewrite the journal as one entry per live node.
    ///
    /// Returns the number of entries in the compacted journal.
    pub fn compact(&self) -> StoreResult<usize> {
        let table = self.table.write().map_err(poisoned)?;
        let before = self.journal.offset()?;
        let snapshot = table.snapshot();
        self.journal.rewrite(&snapshot)?;
        info!(
            entries = snapshot.len(),
            before,
            after = self.journal.offset()?,
            "journal compacted"
        );
        Ok(snapshot.len())
    }

    /// Total number of nodes across all scopes.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.table.read().map_err(poisoned)?.node_count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ScopedBlobStore for JournaledStore {
    fn write(
        &self,
        namespace: &Namespace,
        id: NodeId,
        data: &[u8],
        requester: &Requester,
    ) -> StoreResult<WriteOutcome> {
        let mut table = self.table.write().map_err(poisoned)?;
        let outcome = table.check_write(self.policy, namespace, id, requester)?;

        let mutation = Mutation::Set {
            namespace: namespace.clone(),
            id,
            data: data.to_vec(),
        };
        self.journal.append(&mutation)?;
        let locked = table.apply(mutation);

        debug!(namespace = %namespace, id, len = data.len(), ?outcome, "node written");
        if locked {
            info!(namespace = %namespace, "scope is now immutable");
        }
        Ok(outcome)
    }

    fn delete(&self, namespace: &Namespace, id: NodeId, requester: &Requester) -> StoreResult<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.check_delete(namespace, id, requester)?;

        let mutation = Mutation::Delete {
            namespace: namespace.clone(),
            id,
        };
        self.journal.append(&mutation)?;
        table.apply(mutation);

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

impl std::fmt::Debug for JournaledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledStore")
            .field("journal", &self.journal)
            .field("policy", &self.policy)
            .finish()
    }
}
