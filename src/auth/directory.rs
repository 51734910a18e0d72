//! Identity directory
//!
//! Maps wire usernames to identities carrying group memberships and an
//! active flag. Credential verification happens before a request reaches
//! this crate; the directory only answers "who is this and are they enabled".

use super::Identity;
use crate::config::{AclGatewayConfig, UserEntry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Users file format: `{"users": {"name": {"groups": [..], "enabled": true}}}`
#[derive(Debug, Deserialize)]
struct UsersDocument {
    users: HashMap<String, UserEntry>,
}

/// Known users, keyed by username
#[derive(Debug, Clone, Default)]
pub struct IdentityDirectory {
    users: HashMap<String, UserEntry>,
}

impl IdentityDirectory {
    pub fn new(users: HashMap<String, UserEntry>) -> Self {
        Self { users }
    }

    /// Inline `users` followed by those from `users-file`, if any
    pub fn from_config(config: &AclGatewayConfig) -> Result<Self> {
        let mut directory = Self::new(config.users.clone());
        if let Some(path) = &config.users_file {
            directory.load_file(path)?;
        }
        Ok(directory)
    }

    /// Merge users from a JSON users file; file entries replace inline ones
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file: {}", path.display()))?;
        let document: UsersDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse users file: {}", path.display()))?;

        let count = document.users.len();
        self.users.extend(document.users);
        debug!(path = %path.display(), users = count, "Users file loaded");
        Ok(count)
    }

    /// Resolve a username to an identity
    pub fn lookup(&self, username: &str) -> Option<Identity> {
        self.users.get(username).map(|entry| Identity {
            username: username.to_string(),
            groups: entry.groups.clone(),
            active: entry.enabled,
        })
    }

    pub fn insert(&mut self, username: impl Into<String>, entry: UserEntry) -> Option<UserEntry> {
        self.users.insert(username.into(), entry)
    }

    pub fn remove(&mut self, username: &str) -> Option<UserEntry> {
        self.users.remove(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
