use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid scope name {name:?}: {reason}")]
    InvalidNamespace { name: String, reason: String },

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}
