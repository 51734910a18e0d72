//! ACL entry types and permission rules

use crate::auth::Identity;
use crate::config::AclEntryConfig;
use crate::error::{AclError, AclResult};
use crate::mqtt::{AccessBits, TopicFilter};
use std::collections::BTreeSet;
use std::fmt;

/// A rule binding a topic filter and access bits to an allow/deny decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    /// Filter the entry governs
    pub filter: TopicFilter,
    /// Access kinds the entry governs
    pub access: AccessBits,
    /// Decision when the entry applies to the caller
    pub allow: bool,
    /// Users the entry is restricted to (empty with no groups = public)
    pub users: BTreeSet<String>,
    /// Groups the entry is restricted to
    pub groups: BTreeSet<String>,
    /// Shared secret accepted in place of membership
    pub password: Option<String>,
}

impl AclEntry {
    /// Create a public entry
    pub fn new(filter: TopicFilter, access: AccessBits, allow: bool) -> Self {
        Self {
            filter,
            access,
            allow,
            users: BTreeSet::new(),
            groups: BTreeSet::new(),
            password: None,
        }
    }

    /// Parse the filter and build a public entry
    pub fn parse(filter: &str, access: AccessBits, allow: bool) -> AclResult<Self> {
        Ok(Self::new(TopicFilter::new(filter)?, access, allow))
    }

    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.extend(users.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Compile an entry from configuration
    pub fn from_config(config: &AclEntryConfig) -> AclResult<Self> {
        let access =
            AccessBits::from_bits(config.access).ok_or(AclError::InvalidAccess(config.access))?;

        let mut entry = Self::parse(&config.topic, access, config.allow)?
            .with_users(config.users.iter().cloned())
            .with_groups(config.groups.iter().cloned());

        if let Some(password) = &config.password {
            entry = entry.with_password(password.clone());
        }

        Ok(entry)
    }

    /// An entry is public when it restricts neither identity nor password
    pub fn is_public(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty() && self.password.is_none()
    }

    /// True if the entry covers every requested access bit
    pub fn governs(&self, requested: AccessBits) -> bool {
        self.access.contains(requested)
    }

    /// True if the identity is listed directly or through one of its groups
    pub fn is_member(&self, identity: &Identity) -> bool {
        self.users.contains(&identity.username)
            || identity.groups.iter().any(|g| self.groups.contains(g))
    }

    /// Decide whether the caller is granted by this entry
    ///
    /// A restricted entry inverts its decision for identities that are not
    /// members, so `allow=true` denies outsiders and `allow=false` admits them.
    /// A supplied password is checked last and its result is final.
    pub fn has_permission(&self, identity: Option<&Identity>, password: Option<&str>) -> bool {
        if self.is_public() {
            return self.allow;
        }

        let mut allow = false;

        if let Some(identity) = identity.filter(|i| !i.is_anonymous()) {
            allow = if self.is_member(identity) {
                self.allow
            } else {
                !self.allow
            };
        }

        if let (Some(expected), Some(given)) = (self.password.as_deref(), password) {
            allow = expected == given;
        }

        allow
    }
}

/// Renders as `ACL rs for a/b`
impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ACL {} for {}", self.access, self.filter)
    }
}
