//! Configuration types for the MQTT ACL agent
//!
//! Provides JSON-serializable configuration for the global authorization
//! policy, client ID validation, ACL entries and the identity directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// MQTT ACL Agent Configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct AclGatewayConfig {
    /// Global allow/deny policy
    pub policy: PolicyConfig,

    /// Client ID validation
    pub client_id: ClientIdConfig,

    /// Access Control Lists
    pub acl: AclConfig,

    /// Known users, keyed by username
    pub users: HashMap<String, UserEntry>,

    /// Load additional users from file (`{"users": {...}}`)
    pub users_file: Option<PathBuf>,

    /// Registered client IDs, keyed by client ID
    pub client_ids: HashMap<String, ClientIdEntry>,
}

impl AclGatewayConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

// ============================================================================
// Policy Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicyConfig {
    /// Decision when no ACL entry and no anonymous override apply
    pub default_allow: bool,

    /// Whether anonymous identities are eligible for `default_allow`
    pub anonymous_allow: bool,

    /// Whether a zero-length client ID passes validation
    pub allow_empty_client_id: bool,

    /// Allow requests when the ACL store fails (default: deny)
    pub fail_open: bool,
}

// ============================================================================
// Client ID Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientIdConfig {
    /// Maximum client ID length in characters
    pub max_length: usize,

    /// Regex replacing the built-in character set check
    pub pattern: Option<String>,
}

impl Default for ClientIdConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_client_id_len(),
            pattern: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientIdEntry {
    /// Users allowed to connect with this client ID
    pub users: Vec<String>,
    /// Groups allowed to connect with this client ID
    pub groups: Vec<String>,
}

// ============================================================================
// ACL Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct AclConfig {
    /// Inline ACL entries
    pub entries: Vec<AclEntryConfig>,

    /// Load additional entries from file (JSON list)
    pub entries_file: Option<PathBuf>,
}

impl AclConfig {
    /// Inline entries followed by those from `entries_file`, if any
    pub fn all_entries(&self) -> Result<Vec<AclEntryConfig>> {
        let mut entries = self.entries.clone();
        if let Some(path) = &self.entries_file {
            entries.extend(load_entries_file(path)?);
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AclEntryConfig {
    /// Topic or topic filter the entry governs
    pub topic: String,

    /// Access bitmask (READ=1, WRITE=2, SUBSCRIBE=4)
    pub access: u8,

    /// Decision when the entry applies
    #[serde(default = "default_true")]
    pub allow: bool,

    /// Users the entry is restricted to
    #[serde(default)]
    pub users: Vec<String>,

    /// Groups the entry is restricted to
    #[serde(default)]
    pub groups: Vec<String>,

    /// Shared secret accepted in place of membership
    #[serde(default)]
    pub password: Option<String>,
}

// ============================================================================
// Identity Directory
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    /// Group memberships
    #[serde(default)]
    pub groups: Vec<String>,

    /// Whether the user is active
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for UserEntry {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            enabled: true,
        }
    }
}

/// Load a JSON list of ACL entries
pub fn load_entries_file(path: &Path) -> Result<Vec<AclEntryConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ACL entries file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ACL entries file: {}", path.display()))
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_max_client_id_len() -> usize {
    23
}
