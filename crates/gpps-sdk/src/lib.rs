//! Caller-side SDK for GPPS.
//!
//! The store knows nothing about files. This crate implements the usage
//! convention on top of it: a large object is split into chunks stored at
//! contiguous node ids of one scope, and read back by walking those ids.

pub mod chunk;
pub mod client;
pub mod error;

pub use chunk::{split_chunks, ChunkManifest, DEFAULT_CHUNK_SIZE};
pub use client::Client;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use gpps_store::{ScopedBlobStore, StoreError, WriteOutcome};
pub use gpps_types::{decode_hex, encode_hex, Namespace, NodeId, Requester};
