//! Decision engine boundary and the mask-containment voter

use std::sync::Arc;

use crate::error::{AclError, Result};
use crate::identity::SecurityIdentity;
use crate::mask::{encode, Permission};
use crate::provider::AclProvider;
use crate::session::CurrentPrincipal;
use crate::target::TargetIdentity;

/// What a query is asked about: a target, optionally narrowed to one field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vote {
    pub target: TargetIdentity,
    pub field: Option<String>,
}

impl Vote {
    pub fn target(target: TargetIdentity) -> Self {
        Self { target, field: None }
    }

    pub fn field(target: TargetIdentity, field: &str) -> Self {
        Self { target, field: Some(field.to_string()) }
    }
}

/// Decides whether the current principal holds `attributes`
pub trait AccessDecision: Send + Sync {
    /// `vote: None` is a target-less check (roles).
    fn decide(&self, principal: &CurrentPrincipal, attributes: &Permission, vote: Option<&Vote>) -> Result<bool>;
}

/// Grants when a stored entry of one of the principal's identities contains
/// every required bit. Target-less checks compare role names.
pub struct MaskVoter {
    provider: Arc<dyn AclProvider>,
}

impl MaskVoter {
    pub fn new(provider: Arc<dyn AclProvider>) -> Self {
        Self { provider }
    }

    fn vote_roles(principal: &CurrentPrincipal, attributes: &Permission) -> bool {
        principal
            .principal()
            .map_or(false, |p| attributes.names().iter().any(|r| p.has_role(r)))
    }

    fn vote_acl(&self, identities: &[SecurityIdentity], required: u32, vote: &Vote) -> Result<bool> {
        let Some(acl) = self.provider.find_acl(&vote.target)? else {
            return Ok(false);
        };
        let field = vote.field.as_deref();
        Ok(acl.entries().iter().any(|e| {
            e.granting
                && e.field.as_deref() == field
                && e.mask & required == required
                && identities.contains(&e.identity)
        }))
    }
}

impl AccessDecision for MaskVoter {
    fn decide(&self, principal: &CurrentPrincipal, attributes: &Permission, vote: Option<&Vote>) -> Result<bool> {
        let Some(vote) = vote else {
            return Ok(Self::vote_roles(principal, attributes));
        };
        let Some(p) = principal.principal() else {
            return Ok(false);
        };
        let required = match encode(attributes) {
            Ok(0) => return Ok(false),
            Ok(m) => m,
            Err(AclError::UnknownPermission(name)) => {
                tracing::debug!(%name, "unknown permission in query, denying");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let granted = self.vote_acl(&SecurityIdentity::all_of(p), required, vote)?;
        tracing::debug!(oid = %vote.target, field = ?vote.field, required, granted, "acl vote");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Acl;
    use crate::constants::*;
    use crate::context::{Fields, PermissionContext};
    use crate::provider::MemoryProvider;
    use crate::session::Principal;
    use crate::target::ScopeKind;

    fn setup() -> (Arc<MemoryProvider>, MaskVoter, TargetIdentity) {
        let provider = Arc::new(MemoryProvider::new());
        let target = TargetIdentity::object("Doc", "1");
        let mut acl = Acl::new(target.clone());
        acl.apply(
            &PermissionContext::new(ScopeKind::Object, Fields::none(), Some(SecurityIdentity::user("app", "alice")), Some(OWNER_MASK)),
            true,
        );
        acl.apply(
            &PermissionContext::new(ScopeKind::Object, "title".into(), Some(SecurityIdentity::role("ROLE_EDITOR")), Some(EDIT)),
            true,
        );
        provider.update_acl(&acl).unwrap();
        (provider.clone(), MaskVoter::new(provider), target)
    }

    fn as_user(name: &str, roles: &[&str]) -> CurrentPrincipal {
        CurrentPrincipal::Principal(Principal::new("app", name).with_roles(roles))
    }

    #[test]
    fn owner_implies_view() {
        let (_, v, t) = setup();
        let alice = as_user("alice", &[]);
        assert!(v.decide(&alice, &"VIEW".into(), Some(&Vote::target(t.clone()))).unwrap());
        assert!(v.decide(&alice, &"OWNER".into(), Some(&Vote::target(t))).unwrap());
    }

    #[test]
    fn roles_grant_through_entries() {
        let (_, v, t) = setup();
        let bob = as_user("bob", &["ROLE_EDITOR"]);
        assert!(v.decide(&bob, &"EDIT".into(), Some(&Vote::field(t.clone(), "title"))).unwrap());
        assert!(!v.decide(&bob, &"EDIT".into(), Some(&Vote::target(t.clone()))).unwrap());
        assert!(!v.decide(&bob, &"VIEW".into(), Some(&Vote::field(t, "title"))).unwrap());
    }

    #[test]
    fn unknown_names_and_missing_principals_deny() {
        let (_, v, t) = setup();
        let alice = as_user("alice", &[]);
        assert!(!v.decide(&alice, &"IDDQ".into(), Some(&Vote::target(t.clone()))).unwrap());
        assert!(!v.decide(&alice, &0u32.into(), Some(&Vote::target(t.clone()))).unwrap());
        assert!(!v.decide(&CurrentPrincipal::Anonymous, &"VIEW".into(), Some(&Vote::target(t.clone()))).unwrap());
        assert!(!v.decide(&CurrentPrincipal::NoSession, &"VIEW".into(), Some(&Vote::target(t))).unwrap());
    }

    #[test]
    fn missing_collection_denies() {
        let (_, v, _) = setup();
        let alice = as_user("alice", &[]);
        let other = Vote::target(TargetIdentity::object("Doc", "2"));
        assert!(!v.decide(&alice, &"VIEW".into(), Some(&other)).unwrap());
    }

    #[test]
    fn targetless_checks_compare_roles() {
        let (_, v, _) = setup();
        let admin = as_user("root", &["ROLE_USER", "ROLE_ADMIN"]);
        let user = as_user("joe", &["ROLE_USER"]);
        assert!(v.decide(&admin, &"ROLE_ADMIN".into(), None).unwrap());
        assert!(v.decide(&admin, &["ROLE_ADMIN", "ROLE_USER"].into(), None).unwrap());
        assert!(!v.decide(&user, &"ROLE_ADMIN".into(), None).unwrap());
        assert!(!v.decide(&CurrentPrincipal::Anonymous, &"ROLE_USER".into(), None).unwrap());
    }
}
