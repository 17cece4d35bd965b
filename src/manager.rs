//! The access-control manager
//!
//! Every mutation runs the same pipeline: encode the permission, resolve the
//! identity and the target, load the target's collection, mutate it in
//! memory and persist it. Queries resolve their inputs the same way and hand
//! the decision to an [`AccessDecision`] engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::acl::{Acl, Entry};
use crate::config::Config;
use crate::context::{Fields, PermissionContext};
use crate::db::LmdbProvider;
use crate::error::Result;
use crate::identity::{IdentityResolver, SecurityIdentity, Subject};
use crate::mask::{decode, encode, Permission};
use crate::provider::AclProvider;
use crate::session::{CurrentPrincipal, SessionProvider};
use crate::target::{DefaultTargetResolver, ScopeKind, Target, TargetIdentity, TargetResolver};
use crate::voter::{AccessDecision, MaskVoter, Vote};

/// Grants, revokes and checks permissions on domain objects and types
///
/// The manager keeps no state of its own between calls; share it behind
/// `Arc` across threads.
#[derive(Clone)]
pub struct AclManager {
    provider: Arc<dyn AclProvider>,
    session: Arc<dyn SessionProvider>,
    identities: IdentityResolver,
    targets: Arc<dyn TargetResolver>,
    engine: Arc<dyn AccessDecision>,
}

impl AclManager {
    /// Manager deciding with a [`MaskVoter`] over the same provider
    pub fn new(provider: Arc<dyn AclProvider>, session: Arc<dyn SessionProvider>) -> Self {
        let engine = Arc::new(MaskVoter::new(provider.clone()));
        Self {
            identities: IdentityResolver::new(session.clone()),
            targets: Arc::new(DefaultTargetResolver),
            provider,
            session,
            engine,
        }
    }

    /// Manager over an LMDB store opened from `config`
    pub fn open(config: &Config, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let provider = Arc::new(LmdbProvider::open(config)?);
        Ok(Self::new(provider, session))
    }

    /// Replace the decision engine
    pub fn with_engine(mut self, engine: Arc<dyn AccessDecision>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_target_resolver(mut self, targets: Arc<dyn TargetResolver>) -> Self {
        self.targets = targets;
        self
    }

    pub fn provider(&self) -> &Arc<dyn AclProvider> {
        &self.provider
    }

    // ========================================================================
    // Grant (additive)
    // ========================================================================

    /// Add `attributes` to what `identity` holds on one instance
    pub fn add_object_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), Fields::none(), attributes.into(), identity.into(), ScopeKind::Object, false)
    }

    /// Add `attributes` to what `identity` holds on every instance of a type
    pub fn add_class_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), Fields::none(), attributes.into(), identity.into(), ScopeKind::Class, false)
    }

    pub fn add_object_field_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), fields.into(), attributes.into(), identity.into(), ScopeKind::Object, false)
    }

    pub fn add_class_field_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), fields.into(), attributes.into(), identity.into(), ScopeKind::Class, false)
    }

    // ========================================================================
    // Grant (overwrite)
    // ========================================================================

    /// Replace whatever `identity` holds on one instance with `attributes`
    pub fn set_object_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), Fields::none(), attributes.into(), identity.into(), ScopeKind::Object, true)
    }

    pub fn set_class_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), Fields::none(), attributes.into(), identity.into(), ScopeKind::Class, true)
    }

    pub fn set_object_field_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), fields.into(), attributes.into(), identity.into(), ScopeKind::Object, true)
    }

    pub fn set_class_field_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        attributes: impl Into<Permission>,
        identity: impl Into<Subject>,
    ) -> Result<&Self> {
        self.grant(target.into(), fields.into(), attributes.into(), identity.into(), ScopeKind::Class, true)
    }

    // ========================================================================
    // Revoke
    // ========================================================================

    /// Clear `attributes` bits from whole-target entries. `identity: None`
    /// clears them for every identity.
    pub fn revoke_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        attributes: impl Into<Permission>,
        identity: Option<Subject>,
        scope: ScopeKind,
    ) -> Result<&Self> {
        self.revoke(target.into(), Fields::none(), attributes.into(), identity, scope)
    }

    pub fn revoke_field_permission<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        attributes: impl Into<Permission>,
        identity: Option<Subject>,
        scope: ScopeKind,
    ) -> Result<&Self> {
        self.revoke(target.into(), fields.into(), attributes.into(), identity, scope)
    }

    /// Remove whole-target entries of one instance regardless of their mask
    pub fn revoke_all_object_permissions<'t>(
        &self,
        target: impl Into<Target<'t>>,
        identity: Option<Subject>,
    ) -> Result<&Self> {
        self.revoke_all(target.into(), Fields::none(), identity, ScopeKind::Object)
    }

    /// Remove whole-target entries of a type. Other types are untouched.
    pub fn revoke_all_class_permissions<'t>(
        &self,
        target: impl Into<Target<'t>>,
        identity: Option<Subject>,
    ) -> Result<&Self> {
        self.revoke_all(target.into(), Fields::none(), identity, ScopeKind::Class)
    }

    pub fn revoke_all_object_field_permissions<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        identity: Option<Subject>,
    ) -> Result<&Self> {
        self.revoke_all(target.into(), fields.into(), identity, ScopeKind::Object)
    }

    pub fn revoke_all_class_field_permissions<'t>(
        &self,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        identity: Option<Subject>,
    ) -> Result<&Self> {
        self.revoke_all(target.into(), fields.into(), identity, ScopeKind::Class)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Does the current principal hold `attributes`?
    ///
    /// Without a target the attributes are role names and any held one
    /// grants. Denials, unknown names and missing sessions are `Ok(false)`.
    pub fn is_granted(
        &self,
        attributes: impl Into<Permission>,
        target: Option<Target<'_>>,
        scope: ScopeKind,
    ) -> Result<bool> {
        let attributes = attributes.into();
        let principal = self.session.current();
        let Some(target) = target else {
            return self.engine.decide(&principal, &attributes, None);
        };
        let oid = self.targets.resolve(&target, scope)?;
        self.engine.decide(&principal, &attributes, Some(&Vote::target(oid)))
    }

    /// True when every field is granted, so an empty field list is granted.
    /// Each field is voted on even after a denial.
    pub fn is_field_granted<'t>(
        &self,
        attributes: impl Into<Permission>,
        target: impl Into<Target<'t>>,
        fields: impl Into<Fields>,
        scope: ScopeKind,
    ) -> Result<bool> {
        let (attributes, fields) = (attributes.into(), fields.into());
        let oid = self.targets.resolve(&target.into(), scope)?;
        let principal = self.session.current();
        let votes = fields
            .iter()
            .map(|f| self.engine.decide(&principal, &attributes, Some(&Vote::field(oid.clone(), f))))
            .collect::<Result<Vec<bool>>>()?;
        Ok(votes.into_iter().all(|granted| granted))
    }

    pub fn current_principal(&self) -> CurrentPrincipal {
        self.session.current()
    }

    /// Stored entries of a target; empty when it has no collection
    pub fn find_entries<'t>(&self, target: impl Into<Target<'t>>, scope: ScopeKind) -> Result<Vec<Entry>> {
        let oid = self.targets.resolve(&target.into(), scope)?;
        Ok(self
            .provider
            .find_acl(&oid)?
            .map(|acl| acl.entries().to_vec())
            .unwrap_or_default())
    }

    // ========================================================================
    // Batch & maintenance
    // ========================================================================

    /// Load the object-scope collections of many targets in one call
    pub fn preload(&self, targets: &[Target<'_>], identities: &[Subject]) -> Result<HashMap<TargetIdentity, Acl>> {
        self.preload_scoped(targets, identities, ScopeKind::Object)
    }

    pub fn preload_scoped(
        &self,
        targets: &[Target<'_>],
        identities: &[Subject],
        scope: ScopeKind,
    ) -> Result<HashMap<TargetIdentity, Acl>> {
        let oids = targets
            .iter()
            .map(|t| self.targets.resolve(t, scope))
            .collect::<Result<Vec<_>>>()?;
        let sids = identities
            .iter()
            .map(|s| self.identities.resolve(s.clone()))
            .collect::<Result<Vec<_>>>()?;
        let found = self.provider.find_acls(&oids, &sids)?;
        tracing::debug!(%scope, targets = oids.len(), found = found.len(), "preloaded acls");
        Ok(found)
    }

    /// Drop every entry stored for a target
    pub fn delete_target_entries<'t>(&self, target: impl Into<Target<'t>>, scope: ScopeKind) -> Result<&Self> {
        let oid = self.targets.resolve(&target.into(), scope)?;
        self.provider.delete_acl(&oid)?;
        Ok(self)
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn grant(
        &self,
        target: Target<'_>,
        fields: Fields,
        attributes: Permission,
        identity: Subject,
        scope: ScopeKind,
        overwrite: bool,
    ) -> Result<&Self> {
        let mask = encode(&attributes)?;
        let sid = self.identities.resolve(identity)?;
        let ctx = PermissionContext::new(scope, fields, Some(sid), Some(mask));
        let oid = self.targets.resolve(&target, scope)?;

        let mut acl = self.provider.load_or_create(&oid)?;
        let changes = acl.apply(&ctx, overwrite);
        self.provider.update_acl(&acl)?;
        tracing::debug!(
            oid = %oid,
            identity = %sid_of(&ctx),
            names = ?decode(mask),
            overwrite,
            inserted = changes.inserted,
            updated = changes.updated,
            "granted"
        );
        Ok(self)
    }

    fn revoke(
        &self,
        target: Target<'_>,
        fields: Fields,
        attributes: Permission,
        identity: Option<Subject>,
        scope: ScopeKind,
    ) -> Result<&Self> {
        let mask = encode(&attributes)?;
        let sid = self.identities.resolve_opt(identity)?;
        let ctx = PermissionContext::new(scope, fields, sid, Some(mask));
        let oid = self.targets.resolve(&target, scope)?;

        let mut acl = self.provider.load_or_create(&oid)?;
        let changes = acl.revoke(&ctx);
        self.provider.update_acl(&acl)?;
        tracing::debug!(
            oid = %oid,
            identity = %sid_of(&ctx),
            mask,
            updated = changes.updated,
            removed = changes.removed,
            "revoked"
        );
        Ok(self)
    }

    fn revoke_all(
        &self,
        target: Target<'_>,
        fields: Fields,
        identity: Option<Subject>,
        scope: ScopeKind,
    ) -> Result<&Self> {
        let sid = self.identities.resolve_opt(identity)?;
        let ctx = PermissionContext::new(scope, fields, sid, None);
        let oid = self.targets.resolve(&target, scope)?;

        let mut acl = self.provider.load_or_create(&oid)?;
        let changes = acl.revoke_all(&ctx);
        self.provider.update_acl(&acl)?;
        tracing::debug!(oid = %oid, identity = %sid_of(&ctx), removed = changes.removed, "revoked all");
        Ok(self)
    }
}

fn sid_of(ctx: &PermissionContext) -> String {
    ctx.identity().map_or_else(|| "*".to_string(), SecurityIdentity::to_string)
}

impl std::fmt::Debug for AclManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::error::AclError;
    use crate::provider::MemoryProvider;
    use crate::session::{Principal, SessionStore};
    use crate::target::DomainObject;

    struct Doc(&'static str);

    impl DomainObject for Doc {
        fn type_name(&self) -> &str {
            "Doc"
        }
        fn object_key(&self) -> String {
            self.0.to_string()
        }
    }

    fn setup() -> (Arc<MemoryProvider>, Arc<SessionStore>, AclManager) {
        let provider = Arc::new(MemoryProvider::new());
        let session = Arc::new(SessionStore::new());
        let manager = AclManager::new(provider.clone(), session.clone());
        (provider, session, manager)
    }

    fn alice() -> Principal {
        Principal::new("app", "alice")
    }

    #[test]
    fn set_then_check() {
        let (_, session, m) = setup();
        let doc = Doc("1");
        m.set_object_permission(&doc, "EDIT", alice()).unwrap();
        session.login(alice());
        assert!(m.is_granted("EDIT", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
        assert!(!m.is_granted("DELETE", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
        assert!(!m.is_granted("EDIT", Some(Target::of(&Doc("2"))), ScopeKind::Object).unwrap());
    }

    #[test]
    fn add_merges_and_set_replaces() {
        let (_, _, m) = setup();
        let doc = Doc("1");
        m.add_object_permission(&doc, "VIEW", alice())
            .unwrap()
            .add_object_permission(&doc, "DELETE", alice())
            .unwrap();
        assert_eq!(m.find_entries(&doc, ScopeKind::Object).unwrap()[0].mask, VIEW | DELETE);

        m.set_object_permission(&doc, "EDIT", alice()).unwrap();
        let entries = m.find_entries(&doc, ScopeKind::Object).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mask, EDIT);
    }

    #[test]
    fn current_subject_needs_a_login() {
        let (provider, session, m) = setup();
        let doc = Doc("1");
        assert!(matches!(
            m.add_object_permission(&doc, "VIEW", Subject::Current),
            Err(AclError::NoCurrentIdentity)
        ));
        session.anonymous();
        assert!(m.set_object_permission(&doc, "VIEW", Subject::Current).is_err());
        assert!(provider.is_empty());

        session.login(alice());
        m.add_object_permission(&doc, "VIEW", Subject::Current).unwrap();
        assert!(m.is_granted("VIEW", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
    }

    #[test]
    fn unknown_permission_never_persists() {
        let (provider, _, m) = setup();
        let err = m.add_object_permission(&Doc("1"), "IDDQ", alice()).unwrap_err();
        assert!(matches!(err, AclError::UnknownPermission(ref n) if n == "IDDQ"));
        assert!(provider.is_empty());
        assert!(m.revoke_permission(&Doc("1"), "IDDQ", None, ScopeKind::Object).is_err());
        assert!(provider.is_empty());
    }

    #[test]
    fn class_scope_is_shared_by_instances() {
        let (_, session, m) = setup();
        m.add_class_permission(Target::named("Doc"), "VIEW", "ROLE_READER").unwrap();
        session.login(alice().with_role("ROLE_READER"));
        assert!(m.is_granted("VIEW", Some(Target::of(&Doc("1"))), ScopeKind::Class).unwrap());
        assert!(m.is_granted("VIEW", Some(Target::of(&Doc("2"))), ScopeKind::Class).unwrap());
        assert!(!m.is_granted("VIEW", Some(Target::of(&Doc("1"))), ScopeKind::Object).unwrap());
    }

    #[test]
    fn object_scope_rejects_type_names() {
        let (_, _, m) = setup();
        assert!(matches!(
            m.add_object_permission(Target::named("Doc"), "VIEW", alice()),
            Err(AclError::UnresolvableTarget(_))
        ));
    }

    #[test]
    fn field_checks_are_conjunctive() {
        let (_, session, m) = setup();
        let doc = Doc("1");
        m.add_object_field_permission(&doc, ["title", "body"], "EDIT", alice()).unwrap();
        session.login(alice());
        assert!(m.is_field_granted("EDIT", &doc, "title", ScopeKind::Object).unwrap());
        assert!(m.is_field_granted("EDIT", &doc, ["title", "body"], ScopeKind::Object).unwrap());
        assert!(!m.is_field_granted("EDIT", &doc, ["title", "tags"], ScopeKind::Object).unwrap());
        assert!(!m.is_granted("EDIT", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
    }

    #[test]
    fn empty_field_list_is_vacuously_granted() {
        let (_, session, m) = setup();
        let doc = Doc("1");
        assert!(m.is_field_granted("EDIT", &doc, Fields::none(), ScopeKind::Object).unwrap());
        session.login(alice());
        assert!(m.is_field_granted("OWNER", &doc, Fields::none(), ScopeKind::Object).unwrap());
        assert_eq!(Fields::none().len(), 0);
        assert!(m.is_field_granted("VIEW", Target::named("Doc"), Vec::<String>::new(), ScopeKind::Class).unwrap());
    }

    #[test]
    fn revoke_clears_only_named_bits() {
        let (_, session, m) = setup();
        let doc = Doc("1");
        m.set_object_permission(&doc, ["VIEW", "EDIT"], alice()).unwrap();
        m.revoke_permission(&doc, "EDIT", Some(alice().into()), ScopeKind::Object).unwrap();
        session.login(alice());
        assert!(m.is_granted("VIEW", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
        assert!(!m.is_granted("EDIT", Some(Target::of(&doc)), ScopeKind::Object).unwrap());

        m.revoke_permission(&doc, "VIEW", None, ScopeKind::Object).unwrap();
        assert!(m.find_entries(&doc, ScopeKind::Object).unwrap().is_empty());
    }

    #[test]
    fn revoke_all_keeps_other_targets() {
        let (_, _, m) = setup();
        let (a, b) = (Doc("a"), Doc("b"));
        m.set_object_permission(&a, "OWNER", alice()).unwrap();
        m.set_object_permission(&a, "VIEW", "ROLE_USER").unwrap();
        m.set_object_permission(&b, "VIEW", "ROLE_USER").unwrap();

        m.revoke_all_object_permissions(&a, None).unwrap();
        assert!(m.find_entries(&a, ScopeKind::Object).unwrap().is_empty());
        assert_eq!(m.find_entries(&b, ScopeKind::Object).unwrap().len(), 1);
    }

    #[test]
    fn role_checks_without_target() {
        let (_, session, m) = setup();
        assert!(!m.is_granted("ROLE_ADMIN", None, ScopeKind::Object).unwrap());
        session.login(alice().with_roles(&["ROLE_USER", "ROLE_ADMIN"]));
        assert!(m.is_granted("ROLE_ADMIN", None, ScopeKind::Object).unwrap());
        assert!(m.is_granted(["ROLE_ROOT", "ROLE_USER"], None, ScopeKind::Object).unwrap());
        assert!(!m.is_granted("ROLE_ROOT", None, ScopeKind::Object).unwrap());
    }

    #[test]
    fn preload_and_delete() {
        let (provider, _, m) = setup();
        let (a, b, c) = (Doc("a"), Doc("b"), Doc("c"));
        m.set_object_permission(&a, "VIEW", alice()).unwrap();
        m.set_object_permission(&b, "VIEW", "ROLE_USER").unwrap();

        let all = m.preload(&[Target::of(&a), Target::of(&b), Target::of(&c)], &[]).unwrap();
        assert_eq!(all.len(), 2);
        let mine = m.preload(&[Target::of(&a), Target::of(&b)], &[Subject::from(alice())]).unwrap();
        assert_eq!(mine[&TargetIdentity::object("Doc", "a")].entries().len(), 1);
        assert!(mine[&TargetIdentity::object("Doc", "b")].is_empty());

        m.delete_target_entries(&a, ScopeKind::Object).unwrap();
        assert_eq!(provider.len(), 1);
    }

    /// Grants everything and counts how often it was asked
    #[derive(Default)]
    struct CountingEngine(std::sync::atomic::AtomicUsize);

    impl AccessDecision for CountingEngine {
        fn decide(&self, _: &CurrentPrincipal, _: &Permission, _: Option<&Vote>) -> Result<bool> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(true)
        }
    }

    /// Accepts `Type:key` names in object scope
    struct QualifiedNames;

    impl TargetResolver for QualifiedNames {
        fn resolve(&self, target: &Target<'_>, scope: ScopeKind) -> Result<TargetIdentity> {
            match (target, scope) {
                (Target::Name(n), ScopeKind::Object) => match n.split_once(':') {
                    Some((t, k)) => Ok(TargetIdentity::object(t, k)),
                    None => DefaultTargetResolver.resolve(target, scope),
                },
                _ => DefaultTargetResolver.resolve(target, scope),
            }
        }
    }

    #[test]
    fn custom_engine_decides_every_query() {
        let (_, _, m) = setup();
        let engine = Arc::new(CountingEngine::default());
        let m = m.with_engine(engine.clone());
        let doc = Doc("1");
        assert!(m.is_granted("OWNER", Some(Target::of(&doc)), ScopeKind::Object).unwrap());
        assert!(m.is_field_granted("EDIT", &doc, ["a", "b"], ScopeKind::Object).unwrap());
        assert_eq!(engine.0.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn custom_target_resolver_is_used_for_mutations_and_queries() {
        let (_, session, m) = setup();
        let m = m.with_target_resolver(Arc::new(QualifiedNames));
        m.set_object_permission(Target::named("Doc:7"), "EDIT", alice()).unwrap();
        session.login(alice());
        assert!(m.is_granted("EDIT", Some(Target::of(&Doc("7"))), ScopeKind::Object).unwrap());
        assert!(m.is_granted("EDIT", Some(Target::named("Doc:7")), ScopeKind::Object).unwrap());

        let stored = m.provider().find_acl(&TargetIdentity::object("Doc", "7")).unwrap().unwrap();
        assert_eq!(stored.entries().len(), 1);
    }

    #[test]
    fn current_principal_reflects_session() {
        let (_, session, m) = setup();
        assert_eq!(m.current_principal(), CurrentPrincipal::NoSession);
        session.anonymous();
        assert_eq!(m.current_principal(), CurrentPrincipal::Anonymous);
        session.login(alice());
        assert_eq!(m.current_principal().principal(), Some(&alice()));
    }
}
