//! Access Control List (ACL) module
//!
//! Provides topic-based access control for MQTT operations: entry storage,
//! resolution of the governing entry for a topic, and permission evaluation.

mod entry;
mod evaluator;
mod resolver;
mod store;
mod trie;

pub use entry::AclEntry;
pub use evaluator::PermissionEvaluator;
pub use resolver::{compare_specificity, select_narrowest, AclResolver};
pub use store::{compile_entries, narrowest_governing, AclStore, MemoryAclStore};
pub use trie::FilterTrie;
