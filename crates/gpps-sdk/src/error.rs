use gpps_types::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("object is empty; nothing to store")]
    EmptyObject,

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("{chunks} chunks starting at node {start} overflow the node id space")]
    IdOverflow { start: NodeId, chunks: u64 },

    #[error("no chunks found at node {0}")]
    NoChunks(NodeId),

    #[error("store error: {0}")]
    Store(#[from] gpps_store::StoreError),
}

pub type SdkResult<T> = Result<T, SdkError>;
