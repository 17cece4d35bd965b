//! Permission bits and storage constants

// Own bit of each permission
pub const VIEW: u32 = 1;
pub const CREATE: u32 = 1 << 1;
pub const EDIT: u32 = 1 << 2;
pub const DELETE: u32 = 1 << 3;
pub const UNDELETE: u32 = 1 << 4;
pub const OPERATOR: u32 = 1 << 5;
pub const MASTER: u32 = 1 << 6;
pub const OWNER: u32 = 1 << 7;

// Cumulative masks: a permission implies everything listed after its own bit
pub const OPERATOR_MASK: u32 = OPERATOR | VIEW | CREATE | EDIT;
pub const MASTER_MASK: u32 = MASTER | OPERATOR_MASK | DELETE | UNDELETE;
pub const OWNER_MASK: u32 = OWNER | MASTER_MASK;

/// Every bit the name table can produce
pub const ALL_BITS: u32 = OWNER_MASK;

/// Name -> resolved mask, in bit order
pub const PERMISSIONS: &[(&str, u32)] = &[
    ("VIEW", VIEW),
    ("CREATE", CREATE),
    ("EDIT", EDIT),
    ("DELETE", DELETE),
    ("UNDELETE", UNDELETE),
    ("OPERATOR", OPERATOR_MASK),
    ("MASTER", MASTER_MASK),
    ("OWNER", OWNER_MASK),
];

// LMDB refuses keys above this size with the default build
pub const MAX_KEY_LEN: usize = 511;

/// First byte of a storage key that was replaced by its digest
pub const HASHED_KEY_MARKER: u8 = 0xFF;

// Scope tags used as the first part of a storage key
pub const OBJECT_SCOPE_TAG: &str = "object";
pub const CLASS_SCOPE_TAG: &str = "class";
