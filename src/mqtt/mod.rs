//! MQTT protocol primitives
//!
//! Provides topic filters, wildcard matching and access bits for the ACL engine.

mod access;
mod topic;

pub use access::AccessBits;
pub use topic::{
    is_system, is_wildcard, validate_filter, validate_topic, TopicFilter, TopicMatcher,
    SYSTEM_PREFIX, TOPIC_SEP, WILDCARD_MULTI_LEVEL, WILDCARD_SINGLE_LEVEL,
};
