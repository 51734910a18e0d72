//! ACL resolution: find the single entry governing a topic and access

use super::entry::AclEntry;
use super::store::AclStore;
use crate::error::AclResult;
use crate::mqtt::{is_system, AccessBits, TopicMatcher};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Resolves the governing ACL entry for a topic
pub struct AclResolver {
    store: Arc<dyn AclStore>,
    topic_matcher: TopicMatcher,
}

impl AclResolver {
    pub fn new(store: Arc<dyn AclStore>) -> Self {
        Self {
            store,
            topic_matcher: TopicMatcher::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn AclStore> {
        &self.store
    }

    /// Find the entry governing `access` on `topic`
    ///
    /// An entry whose filter equals the topic literally always wins. Otherwise
    /// the narrowest matching wildcard entry is chosen. `Ok(None)` means no
    /// entry applies and the caller falls back to its default policy.
    pub fn resolve(&self, topic: &str, access: AccessBits) -> AclResult<Option<Arc<AclEntry>>> {
        if let Some(entry) = self.store.find_exact(topic, access)? {
            debug!(topic = %topic, entry = %entry, "Exact ACL match");
            return Ok(Some(entry));
        }

        let system = is_system(topic);
        let candidates: Vec<Arc<AclEntry>> = self
            .store
            .wildcard_candidates(topic)?
            .into_iter()
            .filter(|entry| {
                entry.filter.is_system() == system
                    && entry.governs(access)
                    && self.topic_matcher.matches(entry.filter.name(), topic)
            })
            .collect();

        let selected = select_narrowest(&candidates);
        if let Some(entry) = &selected {
            debug!(
                topic = %topic,
                entry = %entry,
                candidates = candidates.len(),
                "Wildcard ACL match"
            );
        }
        Ok(selected)
    }
}

/// Pick the narrowest entry among matching wildcard candidates
///
/// Candidates whose filter covers another candidate's filter are dropped.
/// Covering is only a partial order, so several incomparable candidates may
/// remain; those are ranked by [`compare_specificity`].
pub fn select_narrowest(candidates: &[Arc<AclEntry>]) -> Option<Arc<AclEntry>> {
    let minimal: Vec<&Arc<AclEntry>> = candidates
        .iter()
        .filter(|c| !candidates.iter().any(|other| strictly_narrower(other, c)))
        .collect();

    // Covering need not be transitive; rank everything if nothing is minimal
    let pool: Vec<&Arc<AclEntry>> = if minimal.is_empty() {
        candidates.iter().collect()
    } else {
        minimal
    };

    pool.into_iter()
        .min_by(|a, b| compare_specificity(a, b))
        .cloned()
}

fn strictly_narrower(other: &AclEntry, entry: &AclEntry) -> bool {
    entry.filter.covers_filter(&other.filter) && !other.filter.covers_filter(&entry.filter)
}

/// Deterministic ranking of incomparable wildcard entries, most specific first
///
/// 1. more literal levels before the first wildcard
/// 2. more literal levels overall
/// 3. filters not ending in `#` before those that do
/// 4. filter name, lexicographically
/// 5. fewer access bits, then lower wire value
pub fn compare_specificity(a: &AclEntry, b: &AclEntry) -> Ordering {
    b.filter
        .literal_prefix_levels()
        .cmp(&a.filter.literal_prefix_levels())
        .then_with(|| b.filter.literal_levels().cmp(&a.filter.literal_levels()))
        .then_with(|| {
            a.filter
                .ends_with_multi_level()
                .cmp(&b.filter.ends_with_multi_level())
        })
        .then_with(|| a.filter.name().cmp(b.filter.name()))
        .then_with(|| a.access.count().cmp(&b.access.count()))
        .then_with(|| a.access.bits().cmp(&b.access.bits()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::MemoryAclStore;

    fn entry(filter: &str, access: AccessBits, allow: bool) -> AclEntry {
        AclEntry::parse(filter, access, allow).unwrap()
    }

    fn resolver(entries: Vec<AclEntry>) -> AclResolver {
        AclResolver::new(Arc::new(MemoryAclStore::from_entries(entries).unwrap()))
    }

    fn resolved_filter(resolver: &AclResolver, topic: &str, access: AccessBits) -> Option<String> {
        resolver
            .resolve(topic, access)
            .unwrap()
            .map(|e| e.filter.name().to_string())
    }

    /// Store that only implements the required enumeration methods
    struct ScanStore(Vec<Arc<AclEntry>>);

    impl AclStore for ScanStore {
        fn find_all(&self, filter: &str) -> AclResult<Vec<Arc<AclEntry>>> {
            Ok(self
                .0
                .iter()
                .filter(|e| e.filter.name() == filter)
                .cloned()
                .collect())
        }

        fn list_wildcard_candidates(&self, system: bool) -> AclResult<Vec<Arc<AclEntry>>> {
            Ok(self
                .0
                .iter()
                .filter(|e| e.filter.is_wildcard() && e.filter.is_system() == system)
                .cloned()
                .collect())
        }

        fn name(&self) -> &str {
            "scan"
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let resolver = resolver(vec![
            entry("a/b", AccessBits::READ, false),
            entry("a/+", AccessBits::READ, true),
        ]);

        let resolved = resolver.resolve("a/b", AccessBits::READ).unwrap().unwrap();
        assert_eq!(resolved.filter.name(), "a/b");
        assert!(!resolved.allow);

        let resolved = resolver.resolve("a/c", AccessBits::READ).unwrap().unwrap();
        assert_eq!(resolved.filter.name(), "a/+");
        assert!(resolved.allow);
    }

    #[test]
    fn test_no_candidates() {
        let resolver = resolver(vec![entry("a/+", AccessBits::READ, true)]);
        assert!(resolver.resolve("b/c", AccessBits::READ).unwrap().is_none());
        assert!(resolver.resolve("a/b/c", AccessBits::READ).unwrap().is_none());
    }

    #[test]
    fn test_access_must_be_governed() {
        let resolver = resolver(vec![
            entry("a/b", AccessBits::WRITE, true),
            entry("a/+", AccessBits::READ | AccessBits::SUBSCRIBE, true),
        ]);

        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::READ),
            Some("a/+".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::WRITE),
            Some("a/b".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::READ | AccessBits::WRITE),
            None
        );
    }

    #[test]
    fn test_narrowest_wildcard_wins() {
        let resolver = resolver(vec![
            entry("#", AccessBits::READ, true),
            entry("a/#", AccessBits::READ, true),
            entry("a/+", AccessBits::READ, false),
        ]);

        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::READ),
            Some("a/+".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "a/b/c", AccessBits::READ),
            Some("a/#".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "x", AccessBits::READ),
            Some("#".to_string())
        );
    }

    #[test]
    fn test_incomparable_candidates_are_ranked() {
        let resolver = resolver(vec![
            entry("+/b/c", AccessBits::READ, true),
            entry("a/+/c", AccessBits::READ, true),
            entry("a/b/#", AccessBits::READ, true),
        ]);

        // a/b/# has the longest literal prefix
        assert_eq!(
            resolved_filter(&resolver, "a/b/c", AccessBits::READ),
            Some("a/b/#".to_string())
        );

        let resolver = self::resolver(vec![
            entry("+/b", AccessBits::READ, true),
            entry("a/+", AccessBits::READ, true),
        ]);
        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::READ),
            Some("a/+".to_string())
        );
    }

    #[test]
    fn test_same_filter_prefers_narrow_access() {
        let resolver = resolver(vec![
            entry("a/+", AccessBits::ALL, true),
            entry("a/+", AccessBits::READ | AccessBits::SUBSCRIBE, false),
        ]);

        let resolved = resolver.resolve("a/b", AccessBits::READ).unwrap().unwrap();
        assert_eq!(resolved.access, AccessBits::READ | AccessBits::SUBSCRIBE);
    }

    #[test]
    fn test_system_topics_are_isolated() {
        let resolver = resolver(vec![
            entry("#", AccessBits::READ, true),
            entry("$SYS/#", AccessBits::READ, false),
        ]);

        assert_eq!(
            resolved_filter(&resolver, "$SYS/broker/load", AccessBits::READ),
            Some("$SYS/#".to_string())
        );

        let resolver = self::resolver(vec![entry("#", AccessBits::READ, true)]);
        assert_eq!(resolved_filter(&resolver, "$SYS/broker/load", AccessBits::READ), None);
    }

    #[test]
    fn test_subscription_filter_containment() {
        let resolver = resolver(vec![
            entry("a/+", AccessBits::SUBSCRIBE, true),
            entry("a/#", AccessBits::SUBSCRIBE, false),
        ]);

        // a/+ cannot contain a deeper multi-level filter
        assert_eq!(
            resolved_filter(&resolver, "a/b/#", AccessBits::SUBSCRIBE),
            Some("a/#".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "+/+", AccessBits::SUBSCRIBE),
            None
        );

        let resolver = self::resolver(vec![entry("a/+", AccessBits::SUBSCRIBE, true)]);
        assert_eq!(resolved_filter(&resolver, "a/#", AccessBits::SUBSCRIBE), None);
    }

    #[test]
    fn test_default_store_enumeration() {
        let entries = vec![
            Arc::new(entry("a/b", AccessBits::READ, false)),
            Arc::new(entry("a/+", AccessBits::READ, true)),
            Arc::new(entry("#", AccessBits::READ, true)),
        ];
        let resolver = AclResolver::new(Arc::new(ScanStore(entries)));

        assert_eq!(
            resolved_filter(&resolver, "a/b", AccessBits::READ),
            Some("a/b".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "a/c", AccessBits::READ),
            Some("a/+".to_string())
        );
        assert_eq!(
            resolved_filter(&resolver, "z", AccessBits::READ),
            Some("#".to_string())
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = resolver(vec![
            entry("+/b", AccessBits::READ, true),
            entry("a/+", AccessBits::READ, false),
        ]);
        let first = resolver.resolve("a/b", AccessBits::READ).unwrap();
        let second = resolver.resolve("a/b", AccessBits::READ).unwrap();
        assert_eq!(first, second);
    }
}
