//! Permission evaluation for a resolved ACL entry

use super::entry::AclEntry;
use crate::auth::Identity;
use tracing::debug;

/// Turns a resolved entry and the caller's identity into a decision
#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an entry for the caller
    ///
    /// Returns `None` when there is no entry; the caller owns the default
    /// policy and decides in that case.
    pub fn evaluate(
        &self,
        entry: Option<&AclEntry>,
        identity: Option<&Identity>,
        password: Option<&str>,
    ) -> Option<bool> {
        let entry = entry?;
        let allowed = entry.has_permission(identity, password);

        debug!(
            entry = %entry,
            public = entry.is_public(),
            username = ?identity.map(|i| i.username.as_str()),
            allowed,
            "ACL entry evaluated"
        );

        Some(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::AccessBits;

    fn restricted(allow: bool) -> AclEntry {
        AclEntry::parse("t", AccessBits::READ, allow)
            .unwrap()
            .with_users(["alice"])
    }

    #[test]
    fn test_no_entry_defers() {
        let evaluator = PermissionEvaluator::new();
        assert_eq!(evaluator.evaluate(None, Some(&Identity::new("alice")), None), None);
    }

    #[test]
    fn test_public_entry() {
        let evaluator = PermissionEvaluator::new();
        let entry = AclEntry::parse("t", AccessBits::READ, true).unwrap();
        assert_eq!(
            evaluator.evaluate(Some(&entry), Some(&Identity::new("alice")), None),
            Some(true)
        );
    }

    #[test]
    fn test_restricted_inversion() {
        let evaluator = PermissionEvaluator::new();
        let bob = Identity::new("bob");

        assert_eq!(evaluator.evaluate(Some(&restricted(true)), Some(&bob), None), Some(false));
        assert_eq!(evaluator.evaluate(Some(&restricted(false)), Some(&bob), None), Some(true));
    }

    #[test]
    fn test_password_precedence() {
        let evaluator = PermissionEvaluator::new();
        let entry = restricted(true).with_password("p");
        let bob = Identity::new("bob");

        assert_eq!(evaluator.evaluate(Some(&entry), Some(&bob), Some("p")), Some(true));
        assert_eq!(evaluator.evaluate(Some(&entry), Some(&bob), Some("x")), Some(false));
    }
}
