//! Error types for topic parsing, ACL storage and client ID validation

use thiserror::Error;

/// Maximum length of an MQTT topic in bytes
pub const MAX_TOPIC_LEN: usize = 65_535;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic must not be empty")]
    Empty,
    #[error("topic is {0} bytes, limit is {MAX_TOPIC_LEN}")]
    TooLong(usize),
    #[error("topic must not contain NUL characters")]
    NulCharacter,
    #[error("'#' must be the last level and stand alone: {0}")]
    MisplacedMultiLevel(String),
    #[error("'+' must occupy an entire level: {0}")]
    MisplacedSingleLevel(String),
    #[error("wildcards are not allowed in topic names: {0}")]
    WildcardInTopic(String),
}

#[derive(Debug, Error)]
pub enum AclError {
    #[error("invalid ACL filter: {0}")]
    InvalidFilter(#[from] TopicError),
    #[error("unknown access bits {0:#x}")]
    InvalidAccess(u8),
    #[error("an ACL entry for '{filter}' with access {access} already exists")]
    DuplicateEntry { filter: String, access: String },
    #[error("ACL store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type AclResult<T> = Result<T, AclError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientIdError {
    #[error("empty client id not allowed")]
    Empty,
    #[error("client id is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("client id contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("client id does not match required pattern")]
    PatternMismatch,
    #[error("client id '{0}' is not permitted for this identity")]
    NotPermitted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(TopicError::Empty),
            Box::new(TopicError::TooLong(70_000)),
            Box::new(TopicError::MisplacedMultiLevel("a/#/b".to_string())),
            Box::new(AclError::DuplicateEntry {
                filter: "a/+".to_string(),
                access: "r".to_string(),
            }),
            Box::new(AclError::StoreUnavailable("timeout".to_string())),
            Box::new(ClientIdError::TooLong { len: 30, max: 23 }),
            Box::new(ClientIdError::NotPermitted("dev-1".to_string())),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn topic_error_converts_into_acl_error() {
        let err: AclError = TopicError::Empty.into();
        assert!(matches!(err, AclError::InvalidFilter(TopicError::Empty)));
    }
}
