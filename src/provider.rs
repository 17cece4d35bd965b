//! Storage provider boundary and the in-memory provider

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::acl::Acl;
use crate::error::Result;
use crate::identity::SecurityIdentity;
use crate::target::TargetIdentity;

/// Loads, persists and deletes ACE collections
pub trait AclProvider: Send + Sync {
    /// Stored collection for `target`, or a fresh empty one
    fn load_or_create(&self, target: &TargetIdentity) -> Result<Acl>;

    /// Persist the whole collection, replacing what was stored
    fn update_acl(&self, acl: &Acl) -> Result<()>;

    fn delete_acl(&self, target: &TargetIdentity) -> Result<()>;

    /// Stored collection for `target` without creating one
    fn find_acl(&self, target: &TargetIdentity) -> Result<Option<Acl>>;

    /// One batched lookup for many targets. When `identities` is non-empty the
    /// returned collections hold only those identities' entries.
    fn find_acls(
        &self,
        targets: &[TargetIdentity],
        identities: &[SecurityIdentity],
    ) -> Result<HashMap<TargetIdentity, Acl>>;
}

/// Shared batch-find filtering used by the providers
pub(crate) fn view_for(acl: &Acl, identities: &[SecurityIdentity]) -> Acl {
    if identities.is_empty() {
        acl.clone()
    } else {
        acl.restricted_to(identities)
    }
}

/// Collections held in process memory
#[derive(Debug, Default)]
pub struct MemoryProvider {
    acls: RwLock<HashMap<TargetIdentity, Acl>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored collections
    pub fn len(&self) -> usize {
        self.acls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.acls.read().is_empty()
    }
}

impl AclProvider for MemoryProvider {
    fn load_or_create(&self, target: &TargetIdentity) -> Result<Acl> {
        Ok(self
            .acls
            .read()
            .get(target)
            .cloned()
            .unwrap_or_else(|| Acl::new(target.clone())))
    }

    fn update_acl(&self, acl: &Acl) -> Result<()> {
        self.acls.write().insert(acl.target().clone(), acl.clone());
        Ok(())
    }

    fn delete_acl(&self, target: &TargetIdentity) -> Result<()> {
        self.acls.write().remove(target);
        Ok(())
    }

    fn find_acl(&self, target: &TargetIdentity) -> Result<Option<Acl>> {
        Ok(self.acls.read().get(target).cloned())
    }

    fn find_acls(
        &self,
        targets: &[TargetIdentity],
        identities: &[SecurityIdentity],
    ) -> Result<HashMap<TargetIdentity, Acl>> {
        let acls = self.acls.read();
        Ok(targets
            .iter()
            .filter_map(|t| acls.get(t).map(|a| (t.clone(), view_for(a, identities))))
            .collect())
    }
}
