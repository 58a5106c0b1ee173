use gpps_store::{ScopedBlobStore, WriteOutcome};
use gpps_types::{Namespace, NodeId, Requester, IMMUTABLE_SENTINEL, SENTINEL_NODE};
use tracing::{debug, info};

use crate::chunk::{split_chunks, ChunkManifest};
use crate::error::{SdkError, SdkResult};

/// A store handle acting as one authenticated requester.
///
/// Mutations always target the requester's own scope. Reads may target any
/// scope, since node tables are publicly readable.
pub struct Client<'a, S: ScopedBlobStore + ?Sized> {
    store: &'a S,
    requester: Requester,
}

impl<'a, S: ScopedBlobStore + ?Sized> Client<'a, S> {
    pub fn new(store: &'a S, requester: Requester) -> Self {
        Self { store, requester }
    }

    /// The scope this client mutates.
    pub fn namespace(&self) -> &Namespace {
        self.requester.account()
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    // ---- Single nodes ----

    pub fn set(&self, id: NodeId, data: &[u8]) -> SdkResult<WriteOutcome> {
        Ok(self.store.write(self.namespace(), id, data, &self.requester)?)
    }

    pub fn get(&self, namespace: &Namespace, id: NodeId) -> SdkResult<Vec<u8>> {
        Ok(self.store.read(namespace, id)?)
    }

    pub fn del(&self, id: NodeId) -> SdkResult<()> {
        Ok(self.store.delete(self.namespace(), id, &self.requester)?)
    }

    // ---- Locking ----

    /// Permanently freeze this client's scope.
    pub fn lock(&self) -> SdkResult<()> {
        self.set(SENTINEL_NODE, &IMMUTABLE_SENTINEL)?;
        info!(namespace = %self.namespace(), "scope locked");
        Ok(())
    }

    pub fn is_locked(&self) -> SdkResult<bool> {
        Ok(self.store.is_immutable(self.namespace())?)
    }

    // ---- Chunked objects ----

    /// Store `data` as chunks at ids `start, start + 1, ...`.
    ///
    /// Chunks are written one at a time; if a write fails, the chunks
    /// already written stay in place. Starting at node 0 is allowed, but a
    /// first chunk equal to `0xDEAD` would lock the scope.
    pub fn put_object(
        &self,
        start: NodeId,
        data: &[u8],
        chunk_size: usize,
    ) -> SdkResult<ChunkManifest> {
        let chunks = split_chunks(data, chunk_size)?;
        let count = chunks.len() as u64;
        if start.checked_add(count - 1).is_none() {
            return Err(SdkError::IdOverflow {
                start,
                chunks: count,
            });
        }

        for (offset, chunk) in chunks.iter().enumerate() {
            self.set(start + offset as u64, chunk)?;
        }

        let manifest = ChunkManifest {
            start,
            chunks: count,
            total_len: data.len() as u64,
        };
        debug!(namespace = %self.namespace(), ?manifest, "object stored");
        Ok(manifest)
    }

    /// Reassemble the object whose first chunk is at `start`.
    ///
    /// Reads contiguous ids until the first missing one.
    pub fn get_object(&self, namespace: &Namespace, start: NodeId) -> SdkResult<Vec<u8>> {
        let mut data = Vec::new();
        let mut found = 0u64;
        let mut next = Some(start);

        while let Some(id) = next {
            match self.store.read(namespace, id) {
                Ok(chunk) => data.extend_from_slice(&chunk),
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e.into()),
            }
            found += 1;
            next = id.checked_add(1);
        }

        if found == 0 {
            return Err(SdkError::NoChunks(start));
        }
        debug!(namespace = %namespace, start, chunks = found, len = data.len(), "object read");
        Ok(data)
    }

    /// Reassemble exactly the chunks a manifest names.
    ///
    /// Fails with `NotFound` if any chunk is missing.
    pub fn get_object_exact(
        &self,
        namespace: &Namespace,
        manifest: &ChunkManifest,
    ) -> SdkResult<Vec<u8>> {
        let mut data = Vec::with_capacity(manifest.total_len as usize);
        for id in manifest.ids() {
            data.extend_from_slice(&self.store.read(namespace, id)?);
        }
        Ok(data)
    }
}
