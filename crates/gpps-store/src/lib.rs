//! Scoped blob storage for GPPS.
//!
//! This crate implements the node table: arbitrary byte payloads stored under
//! an owner-scoped namespace and keyed by a `u64` id. There is exactly one
//! special value in the data model: [`IMMUTABLE_SENTINEL`](gpps_types::IMMUTABLE_SENTINEL)
//! (`0xDEAD`) stored at node 0 freezes the entire scope, permanently.
//!
//! # Storage Backends
//!
//! All backends implement the [`ScopedBlobStore`] trait:
//!
//! - [`InMemoryScopedStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`JournaledStore`] -- in-memory table rebuilt from an append-only,
//!   CRC-framed [`Journal`] on disk
//!
//! # Design Rules
//!
//! 1. Mutation rules live in [`ScopeTable`]; backends only add locking and
//!    persistence around it.
//! 2. Immutability is derived from node 0 on every call, never cached.
//! 3. A scope exists exactly as long as it holds at least one node.
//! 4. The store never interprets payloads. Splitting large objects across
//!    contiguous ids is a caller convention.
//! 5. Rejected mutations leave no trace, in memory or on disk.

pub mod config;
pub mod error;
pub mod journal;
pub mod journaled;
pub mod memory;
pub mod policy;
pub mod table;
pub mod traits;

pub use config::{StoreConfig, SyncMode};
pub use error::{StoreError, StoreResult};
pub use journal::Journal;
pub use journaled::JournaledStore;
pub use memory::InMemoryScopedStore;
pub use policy::LockPolicy;
pub use table::{Mutation, ScopeTable, WriteOutcome};
pub use traits::{ScopeStats, ScopedBlobStore};
