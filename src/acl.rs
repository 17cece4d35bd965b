//! Access-control entries and the per-target collection that owns them

use serde::{Deserialize, Serialize};

use crate::context::PermissionContext;
use crate::identity::SecurityIdentity;
use crate::target::TargetIdentity;

/// One stored grant, scoped to the target of the collection holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub identity: SecurityIdentity,
    pub field: Option<String>,
    pub mask: u32,
    pub granting: bool,
}

impl Entry {
    pub fn new(identity: SecurityIdentity, field: Option<&str>, mask: u32) -> Self {
        Self {
            identity,
            field: field.map(str::to_string),
            mask,
            granting: true,
        }
    }

    #[inline]
    fn is_slot(&self, identity: &SecurityIdentity, field: Option<&str>) -> bool {
        self.granting && self.identity == *identity && self.field.as_deref() == field
    }
}

/// Ordered entry list owned by exactly one target
///
/// At most one granting entry exists per `(identity, field)` pair; the
/// mutation methods below keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    target: TargetIdentity,
    entries: Vec<Entry>,
}

/// What a mutation did to a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.removed == 0
    }
}

impl Acl {
    pub fn new(target: TargetIdentity) -> Self {
        Self { target, entries: Vec::new() }
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Granting entry for an exact `(identity, field)` slot
    pub fn entry(&self, identity: &SecurityIdentity, field: Option<&str>) -> Option<&Entry> {
        self.entries.iter().find(|e| e.is_slot(identity, field))
    }

    /// Copy holding only the entries of the given identities
    pub fn restricted_to(&self, identities: &[SecurityIdentity]) -> Acl {
        Acl {
            target: self.target.clone(),
            entries: self
                .entries
                .iter()
                .filter(|e| identities.contains(&e.identity))
                .cloned()
                .collect(),
        }
    }

    /// Grant `ctx.mask` to `ctx.identity` on every slot of the context.
    ///
    /// An existing entry is overwritten when `overwrite` is set and merged
    /// (bitwise OR) otherwise. Contexts without identity or mask are no-ops.
    pub fn apply(&mut self, ctx: &PermissionContext, overwrite: bool) -> Changes {
        let mut changes = Changes::default();
        let (Some(identity), Some(mask)) = (ctx.identity(), ctx.mask()) else {
            return changes;
        };
        for slot in ctx.slots() {
            match self.entries.iter_mut().find(|e| e.is_slot(identity, slot)) {
                None => {
                    self.entries.push(Entry::new(identity.clone(), slot, mask));
                    changes.inserted += 1;
                }
                Some(existing) if ctx.equals(existing) => {}
                Some(existing) => {
                    let next = if overwrite { mask } else { existing.mask | mask };
                    if ctx.has_different_permission(existing) && next != existing.mask {
                        existing.mask = next;
                        changes.updated += 1;
                    }
                }
            }
        }
        changes
    }

    /// Clear `ctx.mask` bits from every matching entry, dropping emptied ones.
    ///
    /// A context without mask clears everything, same as [`Acl::revoke_all`].
    pub fn revoke(&mut self, ctx: &PermissionContext) -> Changes {
        let Some(mask) = ctx.mask() else {
            return self.revoke_all(ctx);
        };
        let mut changes = Changes::default();
        self.entries.retain_mut(|e| {
            if !ctx.matches(e) {
                return true;
            }
            let next = e.mask & !mask;
            if next == 0 {
                changes.removed += 1;
                return false;
            }
            if next != e.mask {
                e.mask = next;
                changes.updated += 1;
            }
            true
        });
        changes
    }

    /// Remove every matching entry regardless of its mask
    pub fn revoke_all(&mut self, ctx: &PermissionContext) -> Changes {
        let before = self.entries.len();
        self.entries.retain(|e| !ctx.matches(e));
        Changes {
            removed: before - self.entries.len(),
            ..Changes::default()
        }
    }
}
