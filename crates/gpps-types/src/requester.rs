use std::fmt;

use crate::namespace::Namespace;

/// An identity that has already been authenticated by the host runtime.
///
/// GPPS never verifies signatures. A `Requester` only records which account
/// the runtime says is acting, and may mutate exactly the scope of the same
/// name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Requester {
    account: Namespace,
}

impl Requester {
    pub fn new(account: Namespace) -> Self {
        Self { account }
    }

    /// The authenticated account.
    pub fn account(&self) -> &Namespace {
        &self.account
    }

    /// Whether this requester owns `namespace`.
    pub fn acts_for(&self, namespace: &Namespace) -> bool {
        &self.account == namespace
    }
}

impl From<Namespace> for Requester {
    fn from(account: Namespace) -> Self {
        Self::new(account)
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.account)
    }
}
