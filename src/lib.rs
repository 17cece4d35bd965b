//! maskacl - Bitmask access-control lists for domain objects
//!
//! Permissions are granted to users or roles on a single object instance
//! (object scope) or on every instance of a type (class scope), optionally
//! narrowed to named fields. Names such as `VIEW` or `OWNER` encode into
//! cumulative bitmasks; a check succeeds when a stored entry contains every
//! required bit.
//!
//! ```no_run
//! use std::sync::Arc;
//! use maskacl::{AclManager, Config, Principal, ScopeKind, SessionStore, Target, TargetIdentity};
//!
//! let session = Arc::new(SessionStore::new());
//! let acl = AclManager::open(&Config::new("data/acl"), session.clone())?;
//! let doc = TargetIdentity::object("Document", "42");
//!
//! acl.set_object_permission(doc.clone(), "OWNER", Principal::new("app", "alice"))?;
//! session.login(Principal::new("app", "alice"));
//! assert!(acl.is_granted("EDIT", Some(Target::from(doc)), ScopeKind::Object)?);
//! # Ok::<(), maskacl::AclError>(())
//! ```

pub mod acl;
pub mod config;
pub mod constants;
pub mod context;
pub mod db;
pub mod error;
pub mod identity;
pub mod keys;
pub mod manager;
pub mod mask;
pub mod provider;
pub mod session;
pub mod target;
pub mod voter;

pub use acl::{Acl, Changes, Entry};
pub use config::Config;
pub use constants::*;
pub use context::{Fields, PermissionContext};
pub use db::LmdbProvider;
pub use error::{AclError, Result};
pub use identity::{IdentityResolver, SecurityIdentity, Subject};
pub use manager::AclManager;
pub use mask::{decode, encode, Permission};
pub use provider::{AclProvider, MemoryProvider};
pub use session::{CurrentPrincipal, Principal, Role, SessionProvider, SessionStore, Token};
pub use target::{DefaultTargetResolver, DomainObject, ScopeKind, Target, TargetIdentity, TargetResolver};
pub use voter::{AccessDecision, MaskVoter, Vote};
