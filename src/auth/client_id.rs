//! Client ID validation
//!
//! Checks the format of the client ID (length, character set or configured
//! pattern, empty IDs) and, for client IDs registered with a user/group
//! restriction, that the caller is allowed to use it.

use super::Identity;
use crate::config::{ClientIdConfig, ClientIdEntry};
use crate::error::ClientIdError;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;

/// Built-in client ID character set
fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

/// Validates client IDs before any ACL decision is made
#[derive(Debug)]
pub struct ClientIdValidator {
    allow_empty: bool,
    max_length: usize,
    pattern: Option<Regex>,
    registered: HashMap<String, ClientIdEntry>,
}

impl ClientIdValidator {
    /// Create a validator from configuration
    pub fn new(
        config: &ClientIdConfig,
        allow_empty: bool,
        registered: HashMap<String, ClientIdEntry>,
    ) -> Result<Self> {
        let pattern = config
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("Invalid client ID pattern")?;

        Ok(Self {
            allow_empty,
            max_length: config.max_length,
            pattern,
            registered,
        })
    }

    /// Check the format of a client ID
    pub fn validate(&self, client_id: &str) -> Result<(), ClientIdError> {
        if client_id.is_empty() {
            return if self.allow_empty {
                Ok(())
            } else {
                Err(ClientIdError::Empty)
            };
        }

        let len = client_id.chars().count();
        if len > self.max_length {
            return Err(ClientIdError::TooLong {
                len,
                max: self.max_length,
            });
        }

        match &self.pattern {
            Some(regex) if !regex.is_match(client_id) => Err(ClientIdError::PatternMismatch),
            Some(_) => Ok(()),
            None => match client_id.chars().find(|c| !is_allowed_char(*c)) {
                Some(c) => Err(ClientIdError::InvalidCharacter(c)),
                None => Ok(()),
            },
        }
    }

    /// Check that the caller may use a registered client ID
    ///
    /// Unregistered client IDs and registered ones without users or groups
    /// are open to everyone.
    pub fn check_owner(
        &self,
        client_id: &str,
        identity: Option<&Identity>,
    ) -> Result<(), ClientIdError> {
        let Some(entry) = self.registered.get(client_id) else {
            return Ok(());
        };

        if entry.users.is_empty() && entry.groups.is_empty() {
            return Ok(());
        }

        let permitted = identity.is_some_and(|identity| {
            entry.users.contains(&identity.username)
                || identity.groups.iter().any(|g| entry.groups.contains(g))
        });

        if permitted {
            Ok(())
        } else {
            Err(ClientIdError::NotPermitted(client_id.to_string()))
        }
    }

    /// Format validation followed by the ownership check
    pub fn check(&self, client_id: &str, identity: Option<&Identity>) -> Result<(), ClientIdError> {
        self.validate(client_id)?;
        self.check_owner(client_id, identity)
    }
}
