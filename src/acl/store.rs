//! ACL storage
//!
//! [`AclStore`] is the read interface the resolver consumes. Lookups return
//! `Result` so a backing store can report that it is unavailable; "no entry"
//! is an empty result, never an error.

use super::entry::AclEntry;
use super::trie::FilterTrie;
use crate::config::{load_entries_file, AclEntryConfig};
use crate::error::{AclError, AclResult};
use crate::mqtt::{is_system, AccessBits};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read access to persisted ACL entries
pub trait AclStore: Send + Sync {
    /// All entries whose filter is literally `filter`
    fn find_all(&self, filter: &str) -> AclResult<Vec<Arc<AclEntry>>>;

    /// The entry governing `access` on the literal filter `filter`
    fn find_exact(&self, filter: &str, access: AccessBits) -> AclResult<Option<Arc<AclEntry>>> {
        Ok(narrowest_governing(self.find_all(filter)?, access))
    }

    /// Every wildcard entry on the given side of the system-topic boundary
    fn list_wildcard_candidates(&self, system: bool) -> AclResult<Vec<Arc<AclEntry>>>;

    /// Wildcard entries that may match `topic`
    ///
    /// May return a superset; the resolver applies the matcher. Stores with
    /// an index should override the default full enumeration.
    fn wildcard_candidates(&self, topic: &str) -> AclResult<Vec<Arc<AclEntry>>> {
        self.list_wildcard_candidates(is_system(topic))
    }

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Pick the entry that governs `access` most narrowly
///
/// An entry whose access equals the request wins; otherwise the entry with
/// the fewest extra bits, then the lowest wire value.
pub fn narrowest_governing<I>(entries: I, access: AccessBits) -> Option<Arc<AclEntry>>
where
    I: IntoIterator<Item = Arc<AclEntry>>,
{
    entries
        .into_iter()
        .filter(|entry| entry.governs(access))
        .min_by_key(|entry| (entry.access != access, entry.access.count(), entry.access.bits()))
}

#[derive(Default)]
struct AclIndex {
    by_name: HashMap<String, Vec<Arc<AclEntry>>>,
    wildcards: FilterTrie<Arc<AclEntry>>,
    len: usize,
}

impl AclIndex {
    fn insert(&mut self, entry: AclEntry) -> AclResult<()> {
        let name = entry.filter.name();
        if let Some(existing) = self.by_name.get(name) {
            if existing.iter().any(|e| e.access == entry.access) {
                return Err(AclError::DuplicateEntry {
                    filter: name.to_string(),
                    access: entry.access.to_string(),
                });
            }
        }

        self.insert_unchecked(entry);
        Ok(())
    }

    /// Insert without the (filter, access) uniqueness check
    fn insert_unchecked(&mut self, entry: AclEntry) {
        let entry = Arc::new(entry);
        if entry.filter.is_wildcard() {
            self.wildcards.insert(entry.filter.name(), Arc::clone(&entry));
        }
        self.by_name
            .entry(entry.filter.name().to_string())
            .or_default()
            .push(entry);
        self.len += 1;
    }

    fn remove(&mut self, filter: &str, access: AccessBits) -> Option<Arc<AclEntry>> {
        let entries = self.by_name.get_mut(filter)?;
        let pos = entries.iter().position(|e| e.access == access)?;
        let removed = entries.remove(pos);
        if entries.is_empty() {
            self.by_name.remove(filter);
        }
        if removed.filter.is_wildcard() {
            self.wildcards.remove_where(filter, |e| Arc::ptr_eq(e, &removed));
        }
        self.len -= 1;
        Some(removed)
    }
}

/// In-memory ACL store with a level trie over wildcard filters
#[derive(Default)]
pub struct MemoryAclStore {
    index: RwLock<AclIndex>,
}

impl MemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries, failing on duplicate (filter, access) pairs
    pub fn from_entries<I>(entries: I) -> AclResult<Self>
    where
        I: IntoIterator<Item = AclEntry>,
    {
        let store = Self::new();
        store.replace_all(entries)?;
        Ok(store)
    }

    /// Build a store from entry configuration
    pub fn from_config(entries: &[AclEntryConfig]) -> AclResult<Self> {
        let compiled = compile_entries(entries)?;
        Self::from_entries(compiled)
    }

    /// Add an entry; a second entry for the same filter and access is rejected
    pub fn insert(&self, entry: AclEntry) -> AclResult<()> {
        self.index.write().insert(entry)
    }

    /// Add or replace the entry for its (filter, access) pair
    pub fn upsert(&self, entry: AclEntry) -> Option<Arc<AclEntry>> {
        let mut index = self.index.write();
        let previous = index.remove(entry.filter.name(), entry.access);
        index.insert_unchecked(entry);
        previous
    }

    /// Remove the entry for a (filter, access) pair
    pub fn remove(&self, filter: &str, access: AccessBits) -> Option<Arc<AclEntry>> {
        self.index.write().remove(filter, access)
    }

    /// Atomically replace every entry
    ///
    /// On error the current contents are left untouched.
    pub fn replace_all<I>(&self, entries: I) -> AclResult<()>
    where
        I: IntoIterator<Item = AclEntry>,
    {
        let mut index = AclIndex::default();
        for entry in entries {
            index.insert(entry).inspect_err(|e| {
                warn!(error = %e, "Rejected ACL entry");
            })?;
        }
        debug!(entries = index.len, "ACL entries loaded");
        *self.index.write() = index;
        Ok(())
    }

    pub fn clear(&self) {
        *self.index.write() = AclIndex::default();
    }

    /// Replace every entry with those in a JSON entries file
    pub fn load_file(&self, path: &Path) -> anyhow::Result<usize> {
        let entries = compile_entries(&load_entries_file(path)?)?;
        let count = entries.len();
        self.replace_all(entries)?;
        info!(path = %path.display(), entries = count, "ACL entries file loaded");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.index.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<Arc<AclEntry>> {
        self.index
            .read()
            .by_name
            .values()
            .flat_map(|entries| entries.iter().cloned())
            .collect()
    }

    /// Entries granting READ
    pub fn readable(&self) -> Vec<Arc<AclEntry>> {
        self.with_access(AccessBits::READ)
    }

    /// Entries granting WRITE
    pub fn writable(&self) -> Vec<Arc<AclEntry>> {
        self.with_access(AccessBits::WRITE)
    }

    /// Entries granting SUBSCRIBE
    pub fn subscribable(&self) -> Vec<Arc<AclEntry>> {
        self.with_access(AccessBits::SUBSCRIBE)
    }

    fn with_access(&self, bit: AccessBits) -> Vec<Arc<AclEntry>> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.access.contains(bit))
            .collect()
    }
}

impl AclStore for MemoryAclStore {
    fn find_all(&self, filter: &str) -> AclResult<Vec<Arc<AclEntry>>> {
        Ok(self
            .index
            .read()
            .by_name
            .get(filter)
            .cloned()
            .unwrap_or_default())
    }

    fn list_wildcard_candidates(&self, system: bool) -> AclResult<Vec<Arc<AclEntry>>> {
        Ok(self
            .index
            .read()
            .by_name
            .values()
            .flatten()
            .filter(move |e| e.filter.is_wildcard() && e.filter.is_system() == system)
            .cloned()
            .collect())
    }

    fn wildcard_candidates(&self, topic: &str) -> AclResult<Vec<Arc<AclEntry>>> {
        let system = is_system(topic);
        Ok(self
            .index
            .read()
            .wildcards
            .candidates(topic)
            .into_iter()
            .filter(move |e| e.filter.is_system() == system)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Compile entry configuration, stopping at the first invalid entry
pub fn compile_entries(entries: &[AclEntryConfig]) -> AclResult<Vec<AclEntry>> {
    entries
        .iter()
        .map(|config| {
            AclEntry::from_config(config).inspect_err(|e| {
                warn!(topic = %config.topic, error = %e, "Failed to compile ACL entry");
            })
        })
        .collect()
}
