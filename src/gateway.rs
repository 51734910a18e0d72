//! Authorization gateway
//!
//! Entry point called by the broker's auth hook on every connect, publish and
//! subscribe. Applies the global policy, validates the client ID, resolves the
//! governing ACL entry and evaluates it for the caller.

use crate::acl::{
    compile_entries, AclEntry, AclResolver, AclStore, MemoryAclStore, PermissionEvaluator,
};
use crate::auth::{ClientIdValidator, Identity, IdentityDirectory};
use crate::config::{AclGatewayConfig, PolicyConfig, UserEntry};
use crate::error::{AclError, ClientIdError};
use crate::mqtt::{is_wildcard, validate_filter, validate_topic, AccessBits, WILDCARD_MULTI_LEVEL};

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One authorization request
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    /// Caller; `None` is anonymous
    pub identity: Option<Identity>,
    /// Password supplied with the request
    pub password: Option<String>,
    /// Topic name, or a topic filter for subscribe-only checks
    pub topic: String,
    /// Requested access; empty for a connect check
    pub access: AccessBits,
    /// Client ID supplied with the request
    pub client_id: Option<String>,
}

impl AccessRequest {
    pub fn new(topic: impl Into<String>, access: AccessBits) -> Self {
        Self {
            topic: topic.into(),
            access,
            ..Default::default()
        }
    }

    /// A connect check, which carries no access bits
    pub fn connect() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn is_connect(&self) -> bool {
        self.access.is_empty()
    }
}

/// Request as sent by the broker auth plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: Option<String>,
    /// Access bitmask; absent for a connect check
    pub acc: Option<u8>,
    pub clientid: Option<String>,
}

/// What produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionSource {
    /// An ACL entry matching the topic
    AclEntry,
    /// The entry on the root `#` filter
    Broadcast,
    /// The configured default and anonymous policy
    DefaultPolicy,
    /// The identity is disabled; ACL entries were not consulted
    InactiveUser,
    /// Client ID validation failed
    InvalidClientId,
    /// Malformed request (bad topic or access bits)
    InvalidRequest,
    /// Username not present in the directory
    UnknownUser,
    /// The ACL store could not be queried
    StoreFailure,
}

/// Result of authorization
#[derive(Debug, Clone, Serialize)]
pub struct AuthDecision {
    /// Whether access is allowed
    pub allowed: bool,
    /// What produced the decision
    pub source: DecisionSource,
    /// The entry that decided, if any
    pub entry: Option<String>,
    /// Reason for the decision
    pub reason: String,
}

impl AuthDecision {
    fn from_entry(entry: &AclEntry, allowed: bool) -> Self {
        Self {
            allowed,
            source: DecisionSource::AclEntry,
            entry: Some(entry.to_string()),
            reason: format!("{} by {}", verb(allowed), entry),
        }
    }

    fn broadcast(entry: Option<&AclEntry>, allowed: bool) -> Self {
        Self {
            allowed,
            source: DecisionSource::Broadcast,
            entry: entry.map(ToString::to_string),
            reason: format!("{} by broadcast rule", verb(allowed)),
        }
    }

    fn default_policy(allowed: bool) -> Self {
        Self {
            allowed,
            source: DecisionSource::DefaultPolicy,
            entry: None,
            reason: format!("No matching ACL, default {}", if allowed { "allow" } else { "deny" }),
        }
    }

    fn anonymous_denied() -> Self {
        Self {
            allowed: false,
            source: DecisionSource::DefaultPolicy,
            entry: None,
            reason: "Anonymous access not allowed".to_string(),
        }
    }

    fn inactive(allowed: bool) -> Self {
        Self {
            allowed,
            source: DecisionSource::InactiveUser,
            entry: None,
            reason: "User is disabled, ACL not consulted".to_string(),
        }
    }

    fn invalid_client_id(error: &ClientIdError) -> Self {
        Self {
            allowed: false,
            source: DecisionSource::InvalidClientId,
            entry: None,
            reason: error.to_string(),
        }
    }

    fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            source: DecisionSource::InvalidRequest,
            entry: None,
            reason: reason.into(),
        }
    }

    fn unknown_user(username: &str) -> Self {
        Self {
            allowed: false,
            source: DecisionSource::UnknownUser,
            entry: None,
            reason: format!("Unknown user: {}", username),
        }
    }

    fn store_failure(error: &AclError, fail_open: bool) -> Self {
        Self {
            allowed: fail_open,
            source: DecisionSource::StoreFailure,
            entry: None,
            reason: format!("ACL resolution failed: {}", error),
        }
    }

    /// True if the request was rejected before any ACL decision
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.source,
            DecisionSource::InvalidClientId
                | DecisionSource::InvalidRequest
                | DecisionSource::UnknownUser
        )
    }
}

fn verb(allowed: bool) -> &'static str {
    if allowed {
        "Allowed"
    } else {
        "Denied"
    }
}

/// Configuration-derived state, replaced as a whole on reconfigure
struct GatewayState {
    /// Global policy
    policy: PolicyConfig,
    /// Client ID validation
    client_ids: ClientIdValidator,
    /// Username to identity
    directory: IdentityDirectory,
}

impl GatewayState {
    fn from_config(config: &AclGatewayConfig) -> Result<Self> {
        Ok(Self {
            policy: config.policy.clone(),
            client_ids: ClientIdValidator::new(
                &config.client_id,
                config.policy.allow_empty_client_id,
                config.client_ids.clone(),
            )?,
            directory: IdentityDirectory::from_config(config)?,
        })
    }
}

/// MQTT ACL gateway
///
/// Every decision runs under one read of the gateway state, and
/// [`reconfigure`](Self::reconfigure) swaps that state and the owned store
/// under the matching write, so a decision never mixes two configurations.
pub struct AclGateway {
    /// Policy, client ID rules and directory
    state: RwLock<GatewayState>,
    /// Governing entry lookup
    resolver: AclResolver,
    /// Entry evaluation
    evaluator: PermissionEvaluator,
    /// Set when the gateway owns its store and can reload it
    memory_store: Option<Arc<MemoryAclStore>>,
}

impl AclGateway {
    /// Create a gateway backed by an in-memory store built from `config`
    pub fn with_config(config: AclGatewayConfig) -> Result<Self> {
        let entries = config.acl.all_entries()?;
        let store = Arc::new(MemoryAclStore::from_config(&entries)?);
        let mut gateway = Self::with_store(config, store.clone())?;
        gateway.memory_store = Some(store);

        info!(entries = entries.len(), "ACL gateway initialized");
        Ok(gateway)
    }

    /// Create a gateway over an external store; `config.acl` is ignored
    pub fn with_store(config: AclGatewayConfig, store: Arc<dyn AclStore>) -> Result<Self> {
        Ok(Self {
            state: RwLock::new(GatewayState::from_config(&config)?),
            resolver: AclResolver::new(store),
            evaluator: PermissionEvaluator::new(),
            memory_store: None,
        })
    }

    /// Apply new configuration
    ///
    /// ACL entries are only replaced when the gateway owns its store. On
    /// error nothing changes.
    pub fn reconfigure(&self, config: AclGatewayConfig) -> Result<()> {
        let next = GatewayState::from_config(&config)?;
        let entries = match &self.memory_store {
            Some(_) => Some(compile_entries(&config.acl.all_entries()?)?),
            None => None,
        };

        let mut state = self.state.write();
        if let (Some(store), Some(entries)) = (&self.memory_store, entries) {
            store.replace_all(entries)?;
        }
        *state = next;

        info!(users = state.directory.len(), "Configuration applied");
        Ok(())
    }

    /// Add or replace a user in the directory
    pub fn set_user(&self, username: impl Into<String>, entry: UserEntry) -> Option<UserEntry> {
        self.state.write().directory.insert(username, entry)
    }

    /// Remove a user from the directory
    pub fn remove_user(&self, username: &str) -> Option<UserEntry> {
        self.state.write().directory.remove(username)
    }

    /// Resolve a username through the directory
    pub fn lookup_user(&self, username: &str) -> Option<Identity> {
        self.state.read().directory.lookup(username)
    }

    pub fn store(&self) -> &Arc<dyn AclStore> {
        self.resolver.store()
    }

    /// Boolean form of [`authorize`](Self::authorize)
    pub fn is_allowed(&self, request: &AccessRequest) -> bool {
        self.authorize(request).allowed
    }

    /// Authorize a request as sent by the broker auth plugin
    pub fn check(&self, request: &AuthRequest) -> AuthDecision {
        let access = match request.acc {
            None => AccessBits::NONE,
            Some(bits) => match AccessBits::from_bits(bits) {
                Some(access) => access,
                None => {
                    info!(acc = bits, "Rejected request with unknown access bits");
                    return AuthDecision::invalid_request(format!("Unknown access bits: {}", bits));
                }
            },
        };

        let state = self.state.read();

        let identity = match request.username.as_deref().filter(|u| !u.is_empty()) {
            None => None,
            Some(username) => match state.directory.lookup(username) {
                Some(identity) => Some(identity),
                None => {
                    info!(username = %username, "Rejected request from unknown user");
                    return AuthDecision::unknown_user(username);
                }
            },
        };

        let request = AccessRequest {
            identity,
            password: request.password.clone(),
            topic: request.topic.clone().unwrap_or_default(),
            access,
            client_id: request.clientid.clone(),
        };
        self.authorize_with(&state, &request)
    }

    /// Authorize a request
    pub fn authorize(&self, request: &AccessRequest) -> AuthDecision {
        let state = self.state.read();
        self.authorize_with(&state, request)
    }

    fn authorize_with(&self, state: &GatewayState, request: &AccessRequest) -> AuthDecision {
        let identity = request.identity.as_ref();
        let policy = &state.policy;

        if let Some(client_id) = request.client_id.as_deref() {
            // The client ID is fixed at CONNECT; later checks may carry it empty
            if request.is_connect() || !client_id.is_empty() {
                if let Err(e) = state.client_ids.check(client_id, identity) {
                    info!(client_id = %client_id, error = %e, "Client ID rejected");
                    return AuthDecision::invalid_client_id(&e);
                }
            }
        }

        if let Err(reason) = validate_request_topic(request) {
            info!(topic = %request.topic, reason = %reason, "Rejected malformed request");
            return AuthDecision::invalid_request(reason);
        }

        let mut allow = policy.default_allow;

        if identity.map_or(true, Identity::is_anonymous) {
            allow &= policy.anonymous_allow;
            if !allow && request.password.is_none() {
                debug!(topic = %request.topic, "Anonymous request denied by policy");
                return AuthDecision::anonymous_denied();
            }
        }

        if let Some(identity) = identity.filter(|i| !i.active) {
            debug!(username = %identity.username, allow, "Inactive user");
            return AuthDecision::inactive(allow);
        }

        match self.decide(request, allow) {
            Ok(decision) => {
                debug!(
                    topic = %request.topic,
                    access = %request.access,
                    allowed = decision.allowed,
                    source = ?decision.source,
                    "Authorization decided"
                );
                decision
            }
            Err(e) => {
                warn!(
                    store = %self.store().name(),
                    topic = %request.topic,
                    error = %e,
                    fail_open = policy.fail_open,
                    "ACL store failure"
                );
                AuthDecision::store_failure(&e, policy.fail_open)
            }
        }
    }

    fn decide(&self, request: &AccessRequest, allow: bool) -> Result<AuthDecision, AclError> {
        let identity = request.identity.as_ref();
        let password = request.password.as_deref();
        let store = self.store();

        if !request.is_connect() {
            if let Some(entry) = self.resolver.resolve(&request.topic, request.access)? {
                let allowed = self
                    .evaluator
                    .evaluate(Some(entry.as_ref()), identity, password)
                    .unwrap_or(allow);
                return Ok(AuthDecision::from_entry(&entry, allowed));
            }

            let broadcast = store.find_exact(WILDCARD_MULTI_LEVEL, request.access)?;
            return Ok(match broadcast {
                Some(entry) => {
                    let allowed = self
                        .evaluator
                        .evaluate(Some(entry.as_ref()), identity, password)
                        .unwrap_or(allow);
                    AuthDecision::broadcast(Some(entry.as_ref()), allowed)
                }
                None => AuthDecision::default_policy(allow),
            });
        }

        // Connect: every broadcast rule must agree
        let broadcast = store.find_all(WILDCARD_MULTI_LEVEL)?;
        if broadcast.is_empty() {
            return Ok(AuthDecision::default_policy(allow));
        }

        let allowed = broadcast.iter().fold(allow, |acc, entry| {
            acc & self
                .evaluator
                .evaluate(Some(entry.as_ref()), identity, password)
                .unwrap_or(allow)
        });
        Ok(AuthDecision::broadcast(None, allowed))
    }
}

/// A topic is required except on connect; filters only on subscribe checks
/// that do not also ask for write access
fn validate_request_topic(request: &AccessRequest) -> Result<(), String> {
    if request.topic.is_empty() {
        return if request.is_connect() {
            Ok(())
        } else {
            Err("Topic is required".to_string())
        };
    }

    let subscription = request.access.is_subscribable() && !request.access.is_writable();
    let result = if is_wildcard(&request.topic) && subscription {
        validate_filter(&request.topic)
    } else {
        validate_topic(&request.topic)
    };

    result.map_err(|e| e.to_string())
}
