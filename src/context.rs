//! Permission context: one unit of work for entry mutation

use crate::acl::Entry;
use crate::identity::SecurityIdentity;
use crate::target::ScopeKind;

/// Field argument: one name or a set of names
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields(Vec<String>);

impl Fields {
    /// No fields: the whole target
    pub fn none() -> Self {
        Fields(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn push_unique(&mut self, field: &str) {
        if !self.0.iter().any(|f| f == field) {
            self.0.push(field.to_string());
        }
    }
}

impl From<&str> for Fields {
    fn from(field: &str) -> Self {
        Fields(vec![field.to_string()])
    }
}

impl From<String> for Fields {
    fn from(field: String) -> Self {
        Fields(vec![field])
    }
}

impl From<&[&str]> for Fields {
    fn from(fields: &[&str]) -> Self {
        let mut f = Fields::none();
        for field in fields {
            f.push_unique(field);
        }
        f
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(fields: [&str; N]) -> Self {
        Fields::from(&fields[..])
    }
}

impl From<Vec<String>> for Fields {
    fn from(fields: Vec<String>) -> Self {
        let mut f = Fields::none();
        for field in &fields {
            f.push_unique(field);
        }
        f
    }
}

/// Immutable description of what a mutation applies to
///
/// `identity: None` means every identity, `mask: None` means every mask,
/// empty `fields` means the whole target (entries without a field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionContext {
    scope: ScopeKind,
    fields: Fields,
    identity: Option<SecurityIdentity>,
    mask: Option<u32>,
    granting: bool,
}

impl PermissionContext {
    pub fn new(scope: ScopeKind, fields: Fields, identity: Option<SecurityIdentity>, mask: Option<u32>) -> Self {
        Self { scope, fields, identity, mask, granting: true }
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn identity(&self) -> Option<&SecurityIdentity> {
        self.identity.as_ref()
    }

    pub fn mask(&self) -> Option<u32> {
        self.mask
    }

    pub fn is_granting(&self) -> bool {
        self.granting
    }

    /// Field slots this context touches: each field, or the whole target
    pub fn slots(&self) -> Vec<Option<&str>> {
        if self.fields.is_empty() {
            vec![None]
        } else {
            self.fields.iter().map(Some).collect()
        }
    }

    /// Entry falls under this context's identity and field selector
    pub fn matches(&self, entry: &Entry) -> bool {
        let identity_ok = self.identity.as_ref().map_or(true, |sid| *sid == entry.identity);
        let field_ok = match entry.field.as_deref() {
            None => self.fields.is_empty(),
            Some(f) => self.fields.iter().any(|x| x == f),
        };
        identity_ok && field_ok
    }

    /// Entry with the same identity, granting flag and mask
    pub fn equals(&self, entry: &Entry) -> bool {
        self.identity.as_ref() == Some(&entry.identity)
            && entry.granting == self.granting
            && self.mask == Some(entry.mask)
    }

    /// Entry with the same identity and granting flag but another mask
    pub fn has_different_permission(&self, entry: &Entry) -> bool {
        self.identity.as_ref() == Some(&entry.identity)
            && entry.granting == self.granting
            && self.mask != Some(entry.mask)
    }
}
