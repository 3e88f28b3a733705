//! Observable authentication state

use crate::identity::{Identity, Role};

/// Snapshot of who is logged in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

impl AuthState {
    /// Process-start state, before the stored session has been checked
    pub const fn loading() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub const fn unauthenticated() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    pub const fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}
