//! Identity module
//!
//! Provides the caller identity seen by the ACL engine, the directory that
//! resolves usernames to identities, and client ID validation.

mod client_id;
mod directory;

pub use client_id::ClientIdValidator;
pub use directory::IdentityDirectory;

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username; empty for the anonymous identity
    pub username: String,
    /// Group memberships used by restricted ACL entries
    pub groups: Vec<String>,
    /// Disabled identities never reach the ACL entries
    pub active: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            groups: Vec::new(),
            active: true,
        }
    }

    pub fn anonymous() -> Self {
        Self::new("")
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}
