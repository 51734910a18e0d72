//! MQTT topic filters and wildcard matching
//!
//! Implements topic filter matching per the MQTT 3.1.1 and 5.0 specifications.
//! Supports single-level (+) and multi-level (#) wildcards, and keeps system
//! topics (those starting with `$`) out of reach of ordinary wildcards.

use crate::error::{TopicError, MAX_TOPIC_LEN};
use std::fmt;

pub const TOPIC_SEP: char = '/';
pub const WILDCARD_SINGLE_LEVEL: &str = "+";
pub const WILDCARD_MULTI_LEVEL: &str = "#";
pub const SYSTEM_PREFIX: char = '$';

/// True if the string contains a `+` or `#` wildcard
pub fn is_wildcard(name: &str) -> bool {
    name.contains('+') || name.contains('#')
}

/// True if the string is a system topic (starts with `$`)
pub fn is_system(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX)
}

/// A validated topic or topic filter
///
/// The wildcard and system classification is derived from the name when the
/// value is built and cannot be changed independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    name: String,
    wildcard: bool,
    system: bool,
}

impl TopicFilter {
    /// Parse a topic filter, which may contain wildcards
    pub fn new(name: impl Into<String>) -> Result<Self, TopicError> {
        let name = name.into();
        validate_filter(&name)?;
        Ok(Self::classify(name))
    }

    /// Parse a concrete topic name; wildcards are rejected
    pub fn topic(name: impl Into<String>) -> Result<Self, TopicError> {
        let name = name.into();
        validate_topic(&name)?;
        Ok(Self::classify(name))
    }

    fn classify(name: String) -> Self {
        Self {
            wildcard: is_wildcard(&name),
            system: is_system(&name),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// True for the root multi-level filter `#` (the broadcast filter)
    pub fn is_broadcast(&self) -> bool {
        self.name == WILDCARD_MULTI_LEVEL
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.name.split(TOPIC_SEP)
    }

    /// Literal equality of the two filter strings
    pub fn equals_filter(&self, other: &TopicFilter) -> bool {
        self.name == other.name
    }

    /// True if this filter matches the given topic name
    pub fn matches_filter(&self, topic: &str) -> bool {
        TopicMatcher::new().matches(&self.name, topic)
    }

    /// True if this filter is a wildcard and matches `other` taken as a topic
    ///
    /// This is a partial order: two filters may be incomparable, e.g. `a/+`
    /// and `+/b`, neither of which covers the other.
    pub fn covers_filter(&self, other: &TopicFilter) -> bool {
        self.wildcard && self.matches_filter(&other.name)
    }

    /// Number of literal levels before the first wildcard level
    pub fn literal_prefix_levels(&self) -> usize {
        self.levels().take_while(|level| !is_wildcard_level(level)).count()
    }

    /// Number of literal levels in the whole filter
    pub fn literal_levels(&self) -> usize {
        self.levels().filter(|level| !is_wildcard_level(level)).count()
    }

    pub fn ends_with_multi_level(&self) -> bool {
        self.name == WILDCARD_MULTI_LEVEL || self.name.ends_with("/#")
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for TopicFilter {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

fn is_wildcard_level(level: &str) -> bool {
    level == WILDCARD_SINGLE_LEVEL || level == WILDCARD_MULTI_LEVEL
}

/// Topic matcher for MQTT topic filters
#[derive(Debug, Clone)]
pub struct TopicMatcher;

impl TopicMatcher {
    /// Create a new topic matcher
    pub fn new() -> Self {
        Self
    }

    /// Check if a topic filter matches a topic
    ///
    /// # Arguments
    /// * `filter` - The stored filter (may contain + and # wildcards)
    /// * `topic` - The topic being checked. It may itself be a filter when
    ///   testing containment between two filters.
    ///
    /// # MQTT Wildcard Rules
    /// * `+` matches exactly one topic level
    /// * `#` matches zero or more trailing levels (must be the last level)
    /// * Identical strings always match, wildcard or not
    /// * A `$` topic is only matched by a `$` filter and vice versa
    ///
    /// # Examples
    /// ```
    /// use sentinel_agent_mqtt_acl::mqtt::TopicMatcher;
    ///
    /// let matcher = TopicMatcher::new();
    /// assert!(matcher.matches("sensors/+/living-room", "sensors/temp/living-room"));
    /// assert!(matcher.matches("sensors/#", "sensors/temp/living-room"));
    /// assert!(!matcher.matches("sensors/+/living-room", "sensors/temp/bedroom"));
    /// assert!(!matcher.matches("#", "$SYS/broker/load"));
    /// ```
    pub fn matches(&self, filter: &str, topic: &str) -> bool {
        if filter == topic {
            return true;
        }

        if !is_wildcard(filter) {
            return false;
        }

        if is_system(filter) != is_system(topic) {
            return false;
        }

        let filter_levels: Vec<&str> = filter.split(TOPIC_SEP).collect();
        let topic_levels: Vec<&str> = topic.split(TOPIC_SEP).collect();

        self.match_levels(&filter_levels, &topic_levels, is_wildcard(topic))
    }

    fn match_levels(&self, filter: &[&str], topic: &[&str], topic_is_filter: bool) -> bool {
        let multi = filter.last() == Some(&WILDCARD_MULTI_LEVEL);

        // `a/#` also matches the parent level `a`
        let required = if multi { filter.len() - 1 } else { filter.len() };
        if topic.len() < required {
            return false;
        }
        if !multi && topic.len() > filter.len() {
            return false;
        }

        for (idx, f_level) in filter.iter().enumerate() {
            match *f_level {
                WILDCARD_MULTI_LEVEL => return true,
                WILDCARD_SINGLE_LEVEL => {
                    // A single-level wildcard never contains a multi-level one
                    if topic_is_filter && topic.get(idx) == Some(&WILDCARD_MULTI_LEVEL) {
                        return false;
                    }
                }
                _ => {
                    if topic.get(idx) != Some(f_level) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Check if a topic filter is valid
    pub fn is_valid_filter(&self, filter: &str) -> bool {
        validate_filter(filter).is_ok()
    }

    /// Check if a topic name is valid (no wildcards allowed)
    pub fn is_valid_topic(&self, topic: &str) -> bool {
        validate_topic(topic).is_ok()
    }

    /// Check if a topic is a system topic (starts with $)
    pub fn is_system_topic(&self, topic: &str) -> bool {
        is_system(topic)
    }
}

impl Default for TopicMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a topic filter
///
/// # Rules
/// * Must be non-empty, at most 65535 bytes, and free of NUL characters
/// * `#` must be the entire last level
/// * `+` must be an entire level
///
/// Empty levels (`a//b`, `/a`) are legal.
pub fn validate_filter(filter: &str) -> Result<(), TopicError> {
    validate_common(filter)?;

    let levels: Vec<&str> = filter.split(TOPIC_SEP).collect();
    let last = levels.len() - 1;

    for (idx, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != WILDCARD_MULTI_LEVEL || idx != last) {
            return Err(TopicError::MisplacedMultiLevel(filter.to_string()));
        }
        if level.contains('+') && *level != WILDCARD_SINGLE_LEVEL {
            return Err(TopicError::MisplacedSingleLevel(filter.to_string()));
        }
    }

    Ok(())
}

/// Validate a concrete topic name
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
    validate_common(topic)?;

    if is_wildcard(topic) {
        return Err(TopicError::WildcardInTopic(topic.to_string()));
    }

    Ok(())
}

fn validate_common(name: &str) -> Result<(), TopicError> {
    if name.is_empty() {
        return Err(TopicError::Empty);
    }
    if name.len() > MAX_TOPIC_LEN {
        return Err(TopicError::TooLong(name.len()));
    }
    if name.contains('\0') {
        return Err(TopicError::NulCharacter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let matcher = TopicMatcher::new();
        assert!(matcher.matches("sensors/temp", "sensors/temp"));
        assert!(!matcher.matches("sensors/temp", "sensors/humidity"));
    }

    #[test]
    fn test_identical_wildcard_strings_match() {
        let matcher = TopicMatcher::new();
        assert!(matcher.matches("a/+", "a/+"));
        assert!(matcher.matches("#", "#"));
        assert!(matcher.matches("$SYS/#", "$SYS/#"));
    }

    #[test]
    fn test_single_level_wildcard() {
        let matcher = TopicMatcher::new();

        assert!(matcher.matches("a/+", "a/b"));
        assert!(matcher.matches("a/+/c", "a/b/c"));
        assert!(matcher.matches("+/temp/living", "sensors/temp/living"));
        assert!(matcher.matches("sport/+", "sport/"));

        // + requires exactly one level
        assert!(!matcher.matches("a/+", "a/b/c"));
        assert!(!matcher.matches("sensors/+", "sensors"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        let matcher = TopicMatcher::new();

        assert!(matcher.matches("a/#", "a"));
        assert!(matcher.matches("a/#", "a/b"));
        assert!(matcher.matches("a/#", "a/b/c"));
        assert!(matcher.matches("#", "anything"));
        assert!(matcher.matches("#", "a/b/c/d"));
        assert!(matcher.matches("#", "/topic"));

        assert!(!matcher.matches("a/#", "b/c"));
        assert!(!matcher.matches("a/b/#", "a"));
    }

    #[test]
    fn test_combined_wildcards() {
        let matcher = TopicMatcher::new();

        assert!(matcher.matches("+/+/+/+", "a/b/c/d"));
        assert!(matcher.matches("+/b/+/d", "a/b/c/d"));
        assert!(matcher.matches("+/#", "a/b/c/d"));
        assert!(matcher.matches("a/+/#", "a/b/c/d"));
        assert!(!matcher.matches("+/+", "a/b/c"));
    }

    #[test]
    fn test_system_topics() {
        let matcher = TopicMatcher::new();

        assert!(matcher.is_system_topic("$SYS/broker/clients"));
        assert!(!matcher.is_system_topic("sensors/temp"));

        assert!(matcher.matches("$SYS/#", "$SYS/broker/load"));
        assert!(matcher.matches("$SYS/+", "$SYS/broker"));
        assert!(!matcher.matches("#", "$SYS/x"));
        assert!(!matcher.matches("+/broker", "$SYS/broker"));
        assert!(!matcher.matches("$SYS/#", "sys/x"));
        assert!(!matcher.matches("$SYS/#", "$OTHER/x"));
    }

    #[test]
    fn test_filter_containment() {
        let matcher = TopicMatcher::new();

        assert!(matcher.matches("a/#", "a/+"));
        assert!(matcher.matches("a/#", "a/b/#"));
        assert!(matcher.matches("+/+", "a/+"));
        assert!(matcher.matches("a/+", "a/+"));

        // + never contains #
        assert!(!matcher.matches("a/+", "a/#"));
        assert!(!matcher.matches("+", "#"));
    }

    #[test]
    fn test_covers_is_partial() {
        let a = TopicFilter::new("a/+").unwrap();
        let b = TopicFilter::new("+/b").unwrap();
        let all = TopicFilter::new("#").unwrap();
        let concrete = TopicFilter::new("a/b").unwrap();

        assert!(!a.covers_filter(&b));
        assert!(!b.covers_filter(&a));
        assert!(all.covers_filter(&a));
        assert!(all.covers_filter(&b));
        assert!(!a.covers_filter(&all));

        // Concrete filters cover nothing, not even themselves
        assert!(!concrete.covers_filter(&concrete));
        assert!(a.covers_filter(&concrete));
    }

    #[test]
    fn test_classification() {
        let filter = TopicFilter::new("$SYS/+/load").unwrap();
        assert!(filter.is_wildcard());
        assert!(filter.is_system());
        assert_eq!(filter.literal_prefix_levels(), 1);
        assert_eq!(filter.literal_levels(), 2);
        assert!(!filter.ends_with_multi_level());

        let topic = TopicFilter::topic("/topic").unwrap();
        assert!(!topic.is_wildcard());
        assert!(!topic.is_system());

        assert!(TopicFilter::new("#").unwrap().is_broadcast());
        assert!(TopicFilter::new("a/#").unwrap().ends_with_multi_level());
    }

    #[test]
    fn test_valid_filters() {
        let matcher = TopicMatcher::new();

        assert!(matcher.is_valid_filter("sensors/temp"));
        assert!(matcher.is_valid_filter("sensors/+"));
        assert!(matcher.is_valid_filter("sensors/#"));
        assert!(matcher.is_valid_filter("+/temp"));
        assert!(matcher.is_valid_filter("#"));
        assert!(matcher.is_valid_filter("+"));
        assert!(matcher.is_valid_filter("/topic"));
        assert!(matcher.is_valid_filter("sensors//temp"));

        assert!(!matcher.is_valid_filter(""));
        assert!(!matcher.is_valid_filter("sensors/temp+1"));
        assert!(!matcher.is_valid_filter("sensors/#/temp"));
        assert!(!matcher.is_valid_filter("sensors/temp#"));
        assert!(!matcher.is_valid_filter("a\0b"));
    }

    #[test]
    fn test_valid_topics() {
        let matcher = TopicMatcher::new();

        assert!(matcher.is_valid_topic("sensors/temp"));
        assert!(matcher.is_valid_topic("$SYS/broker/clients"));

        assert!(!matcher.is_valid_topic("sensors/+"));
        assert!(!matcher.is_valid_topic("sensors/#"));
        assert!(!matcher.is_valid_topic(""));
        assert_eq!(
            TopicFilter::topic("a/+"),
            Err(TopicError::WildcardInTopic("a/+".to_string()))
        );
    }
}
