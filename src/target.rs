//! Target identities and their resolution from caller input

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CLASS_SCOPE_TAG, OBJECT_SCOPE_TAG};
use crate::error::{AclError, Result};
use crate::keys::storage_key;

/// Whether a permission applies to one instance or to a whole type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScopeKind {
    #[default]
    Object,
    Class,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Object => f.write_str(OBJECT_SCOPE_TAG),
            ScopeKind::Class => f.write_str(CLASS_SCOPE_TAG),
        }
    }
}

/// A domain value that can be protected by an ACL
pub trait DomainObject {
    /// Runtime type name; every instance of a type shares its class scope
    fn type_name(&self) -> &str;

    /// Key unique among instances of the same type
    fn object_key(&self) -> String;
}

/// Canonical key for stored permission entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetIdentity {
    Object { type_name: String, key: String },
    Class { type_name: String },
}

impl TargetIdentity {
    pub fn object(type_name: &str, key: &str) -> Self {
        TargetIdentity::Object {
            type_name: type_name.to_string(),
            key: key.to_string(),
        }
    }

    pub fn class(type_name: &str) -> Self {
        TargetIdentity::Class { type_name: type_name.to_string() }
    }

    pub fn scope(&self) -> ScopeKind {
        match self {
            TargetIdentity::Object { .. } => ScopeKind::Object,
            TargetIdentity::Class { .. } => ScopeKind::Class,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            TargetIdentity::Object { type_name, .. } | TargetIdentity::Class { type_name } => type_name,
        }
    }

    /// LMDB key for this target's collection
    pub fn storage_key(&self) -> Vec<u8> {
        match self {
            TargetIdentity::Object { type_name, key } => storage_key(&[OBJECT_SCOPE_TAG, type_name, key]),
            TargetIdentity::Class { type_name } => storage_key(&[CLASS_SCOPE_TAG, type_name]),
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIdentity::Object { type_name, key } => write!(f, "{}#{}", type_name, key),
            TargetIdentity::Class { type_name } => write!(f, "class {}", type_name),
        }
    }
}

/// Target argument accepted by manager operations
#[derive(Clone)]
pub enum Target<'a> {
    Instance(&'a dyn DomainObject),
    Name(String),
    Identity(TargetIdentity),
}

impl<'a> Target<'a> {
    pub fn of<T: DomainObject>(object: &'a T) -> Self {
        Target::Instance(object)
    }

    pub fn named(type_name: &str) -> Self {
        Target::Name(type_name.to_string())
    }
}

impl<'a, T: DomainObject> From<&'a T> for Target<'a> {
    fn from(object: &'a T) -> Self {
        Target::Instance(object)
    }
}

impl From<TargetIdentity> for Target<'_> {
    fn from(oid: TargetIdentity) -> Self {
        Target::Identity(oid)
    }
}

impl From<String> for Target<'_> {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Instance(o) => write!(f, "Instance({}#{})", o.type_name(), o.object_key()),
            Target::Name(n) => write!(f, "Name({})", n),
            Target::Identity(oid) => write!(f, "Identity({})", oid),
        }
    }
}

/// Turns a [`Target`] plus scope into a [`TargetIdentity`]
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, target: &Target<'_>, scope: ScopeKind) -> Result<TargetIdentity>;
}

/// Instances map to their type (class scope) or type and key (object scope)
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTargetResolver;

impl DefaultTargetResolver {
    fn non_empty<'s>(what: &str, s: &'s str) -> Result<&'s str> {
        if s.is_empty() {
            Err(AclError::UnresolvableTarget(format!("{} cannot be empty", what)))
        } else {
            Ok(s)
        }
    }
}

impl TargetResolver for DefaultTargetResolver {
    fn resolve(&self, target: &Target<'_>, scope: ScopeKind) -> Result<TargetIdentity> {
        match (target, scope) {
            (Target::Identity(oid), _) => Ok(oid.clone()),
            (Target::Instance(o), ScopeKind::Class) => {
                Ok(TargetIdentity::class(Self::non_empty("type name", o.type_name())?))
            }
            (Target::Name(n), ScopeKind::Class) => Ok(TargetIdentity::class(Self::non_empty("type name", n)?)),
            (Target::Instance(o), ScopeKind::Object) => {
                let key = o.object_key();
                Ok(TargetIdentity::object(
                    Self::non_empty("type name", o.type_name())?,
                    Self::non_empty("object key", &key)?,
                ))
            }
            (Target::Name(n), ScopeKind::Object) => Err(AclError::UnresolvableTarget(format!(
                "'{}' is a type name, not an instance; object scope needs an instance",
                n
            ))),
        }
    }
}
