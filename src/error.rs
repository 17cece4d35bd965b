//! Error types for maskacl

use thiserror::Error;

/// The main error type for maskacl operations
#[derive(Debug, Error)]
pub enum AclError {
    /// A symbolic permission name is not in the mask table
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// The target could not be turned into an object or class identity
    #[error("Unresolvable target: {0}")]
    UnresolvableTarget(String),

    /// No identity was given and nobody is authenticated
    #[error("No authenticated identity in the current session")]
    NoCurrentIdentity,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for maskacl operations
pub type Result<T> = std::result::Result<T, AclError>;

/// Convert any storage-level error to AclError
pub fn err<E: std::error::Error>(e: E) -> AclError {
    AclError::Storage(e.to_string())
}
