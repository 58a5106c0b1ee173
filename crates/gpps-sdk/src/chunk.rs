use gpps_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Chunk size that fits comfortably in a single ledger transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Where a chunked object was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkManifest {
    /// Id of the first chunk.
    pub start: NodeId,
    /// Number of chunks, stored at `start..start + chunks`.
    pub chunks: u64,
    /// Length of the reassembled object.
    pub total_len: u64,
}

impl ChunkManifest {
    /// Id of the last chunk.
    pub fn last(&self) -> NodeId {
        self.start.saturating_add(self.chunks.saturating_sub(1))
    }

    /// Ids of every chunk, in order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        self.start..=self.last()
    }
}

/// Split `data` into chunks of at most `chunk_size` bytes.
///
/// Only the last chunk may be shorter.
pub fn split_chunks(data: &[u8], chunk_size: usize) -> SdkResult<Vec<&[u8]>> {
    if chunk_size == 0 {
        return Err(SdkError::InvalidChunkSize);
    }
    if data.is_empty() {
        return Err(SdkError::EmptyObject);
    }
    Ok(data.chunks(chunk_size).collect())
}
