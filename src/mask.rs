//! Permission mask codec
//!
//! Turns symbolic permission names into bitmasks using the fixed table in
//! [`crate::constants::PERMISSIONS`]. Cumulative names (OPERATOR, MASTER,
//! OWNER) resolve to the union of everything they imply.

use crate::constants::PERMISSIONS;
use crate::error::{AclError, Result};

/// Permission argument accepted by every manager operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Name(String),
    Names(Vec<String>),
    Mask(u32),
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Permission::Name(s.to_string())
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Permission::Name(s)
    }
}

impl From<u32> for Permission {
    fn from(mask: u32) -> Self {
        Permission::Mask(mask)
    }
}

impl From<&[&str]> for Permission {
    fn from(names: &[&str]) -> Self {
        Permission::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Permission {
    fn from(names: [&str; N]) -> Self {
        Permission::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Vec<String>> for Permission {
    fn from(names: Vec<String>) -> Self {
        Permission::Names(names)
    }
}

impl From<&Permission> for Permission {
    fn from(p: &Permission) -> Self {
        p.clone()
    }
}

impl Permission {
    /// The symbolic names carried by this argument (empty for raw masks)
    pub fn names(&self) -> Vec<&str> {
        match self {
            Permission::Name(n) => vec![n.as_str()],
            Permission::Names(ns) => ns.iter().map(String::as_str).collect(),
            Permission::Mask(_) => Vec::new(),
        }
    }
}

/// Look up a single name (case-insensitive)
#[inline]
pub fn lookup(name: &str) -> Option<u32> {
    PERMISSIONS
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

/// Encode a permission argument into a mask
pub fn encode(permission: &Permission) -> Result<u32> {
    match permission {
        Permission::Mask(m) => Ok(*m),
        Permission::Name(n) => lookup(n).ok_or_else(|| AclError::UnknownPermission(n.clone())),
        Permission::Names(ns) => ns.iter().try_fold(0, |acc, n| {
            lookup(n)
                .map(|m| acc | m)
                .ok_or_else(|| AclError::UnknownPermission(n.clone()))
        }),
    }
}

/// Names whose resolved mask is fully contained in `mask`
pub fn decode(mask: u32) -> Vec<&'static str> {
    PERMISSIONS
        .iter()
        .filter(|(_, m)| mask & m == *m)
        .map(|(n, _)| *n)
        .collect()
}
