//! Foundation types for GPPS (General Purpose Permanent Storage).
//!
//! Every other GPPS crate depends on `gpps-types`.
//!
//! # Key Types
//!
//! - [`Namespace`] -- Validated owner name that scopes a set of nodes
//! - [`Node`] -- A node id paired with its byte payload
//! - [`Requester`] -- An already-authenticated identity acting on a scope
//! - [`IMMUTABLE_SENTINEL`] -- The node-0 payload that freezes a scope

pub mod error;
pub mod namespace;
pub mod node;
pub mod payload;
pub mod requester;

pub use error::TypeError;
pub use namespace::{Namespace, MAX_NAMESPACE_LEN};
pub use node::{is_sentinel, Node, NodeId, IMMUTABLE_SENTINEL, SENTINEL_NODE};
pub use payload::{decode_hex, encode_hex};
pub use requester::Requester;
