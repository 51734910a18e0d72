//! MQTT ACL Agent
//!
//! Authorization back end for an MQTT broker's auth plugin. Every connect,
//! publish and subscribe is answered with an allow/deny decision:
//!
//! - **Topic Filters**: MQTT `+`/`#` wildcard matching and filter containment
//! - **Access Control**: Per-topic ACL entries with read/write/subscribe bits
//! - **Specificity**: The narrowest matching entry governs a topic
//! - **Identities**: Users, groups and inactive accounts
//! - **Client IDs**: Length, character set and ownership checks
//! - **Policy**: Default and anonymous allow with a fail-closed store
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "policy": {
//!     "default-allow": false,
//!     "anonymous-allow": false
//!   },
//!   "client-id": { "max-length": 23 },
//!   "acl": {
//!     "entries": [
//!       { "topic": "sensors/+/data", "access": 2, "groups": ["sensors"] },
//!       { "topic": "sensors/#", "access": 4 },
//!       { "topic": "#", "access": 1, "allow": false }
//!     ]
//!   },
//!   "users": {
//!     "sensor-1": { "groups": ["sensors"] }
//!   }
//! }
//! ```

pub mod acl;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mqtt;

// Re-export main types
pub use acl::{AclEntry, AclResolver, AclStore, MemoryAclStore};
pub use auth::Identity;
pub use config::AclGatewayConfig;
pub use error::{AclError, ClientIdError, TopicError};
pub use gateway::{AccessRequest, AclGateway, AuthDecision, AuthRequest, DecisionSource};
pub use mqtt::{AccessBits, TopicFilter, TopicMatcher};
