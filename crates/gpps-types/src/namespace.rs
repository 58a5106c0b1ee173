//! Scope names.
//!
//! A [`Namespace`] is the owner-supplied partition key of the node table.
//! Names follow ledger account conventions:
//! - 1 to 12 characters
//! - Only `a-z`, `1-5` and `.`
//! - Must not end with `.`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum length of a scope name.
pub const MAX_NAMESPACE_LEN: usize = 12;

const NAME_CHARS: &str = ".12345abcdefghijklmnopqrstuvwxyz";

/// Owner identifier that scopes a set of nodes.
///
/// Comparison and ordering are plain string comparison, so iteration over
/// scopes is deterministic.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Parse and validate a scope name.
    ///
    /// ```
    /// use gpps_types::Namespace;
    ///
    /// assert!(Namespace::new("alice").is_ok());
    /// assert!(Namespace::new("data.store").is_ok());
    /// assert!(Namespace::new("").is_err());
    /// assert!(Namespace::new("Alice").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidNamespace {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if name.len() > MAX_NAMESPACE_LEN {
        return Err(invalid(format!(
            "longer than {MAX_NAMESPACE_LEN} characters"
        )));
    }
    if let Some(ch) = name.chars().find(|c| !NAME_CHARS.contains(*c)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if name.ends_with('.') {
        return Err(invalid("must not end with '.'".into()));
    }
    Ok(())
}

impl FromStr for Namespace {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace({})", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
