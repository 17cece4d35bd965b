//! Security identities and their resolution from caller input

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AclError, Result};
use crate::session::{CurrentPrincipal, Principal, Role, SessionProvider, Token};

/// Canonical key for granted permissions: a user or a role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecurityIdentity {
    User { provider: String, username: String },
    Role(String),
}

impl SecurityIdentity {
    pub fn user(provider: &str, username: &str) -> Self {
        SecurityIdentity::User {
            provider: provider.to_string(),
            username: username.to_string(),
        }
    }

    pub fn role(name: &str) -> Self {
        SecurityIdentity::Role(name.to_string())
    }

    /// User identity of a principal
    pub fn of(principal: &Principal) -> Self {
        Self::user(&principal.provider, &principal.username)
    }

    /// Every identity a principal acts as: itself plus one per held role
    pub fn all_of(principal: &Principal) -> Vec<Self> {
        std::iter::once(Self::of(principal))
            .chain(principal.roles.iter().map(|r| Self::role(r)))
            .collect()
    }

    #[inline]
    pub fn is_role(&self) -> bool {
        matches!(self, SecurityIdentity::Role(_))
    }
}

impl fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityIdentity::User { provider, username } => write!(f, "user:{}/{}", provider, username),
            SecurityIdentity::Role(r) => write!(f, "role:{}", r),
        }
    }
}

/// Identity argument accepted by manager operations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Subject {
    /// Whoever is authenticated in the current session
    #[default]
    Current,
    RoleName(String),
    User(Principal),
    Token(Token),
    Role(Role),
    Identity(SecurityIdentity),
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Subject::RoleName(s.to_string())
    }
}

impl From<String> for Subject {
    fn from(s: String) -> Self {
        Subject::RoleName(s)
    }
}

impl From<Principal> for Subject {
    fn from(p: Principal) -> Self {
        Subject::User(p)
    }
}

impl From<&Principal> for Subject {
    fn from(p: &Principal) -> Self {
        Subject::User(p.clone())
    }
}

impl From<Token> for Subject {
    fn from(t: Token) -> Self {
        Subject::Token(t)
    }
}

impl From<Role> for Subject {
    fn from(r: Role) -> Self {
        Subject::Role(r)
    }
}

impl From<SecurityIdentity> for Subject {
    fn from(sid: SecurityIdentity) -> Self {
        Subject::Identity(sid)
    }
}

impl From<&SecurityIdentity> for Subject {
    fn from(sid: &SecurityIdentity) -> Self {
        Subject::Identity(sid.clone())
    }
}

/// Normalizes [`Subject`] values into [`SecurityIdentity`]
#[derive(Clone)]
pub struct IdentityResolver {
    session: Arc<dyn SessionProvider>,
}

impl IdentityResolver {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self { session }
    }

    pub fn resolve(&self, subject: Subject) -> Result<SecurityIdentity> {
        match subject {
            Subject::Current => match self.session.current() {
                CurrentPrincipal::Principal(p) => Ok(SecurityIdentity::of(&p)),
                CurrentPrincipal::Anonymous | CurrentPrincipal::NoSession => Err(AclError::NoCurrentIdentity),
            },
            Subject::RoleName(name) => Ok(SecurityIdentity::Role(name)),
            Subject::Role(role) => Ok(SecurityIdentity::Role(role.0)),
            Subject::User(p) => Ok(SecurityIdentity::of(&p)),
            Subject::Token(t) => Ok(SecurityIdentity::of(&t.principal)),
            Subject::Identity(sid) => Ok(sid),
        }
    }

    /// Resolve only when given; `None` stays "every identity"
    pub fn resolve_opt(&self, subject: Option<Subject>) -> Result<Option<SecurityIdentity>> {
        subject.map(|s| self.resolve(s)).transpose()
    }
}
