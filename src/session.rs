//! Principals, tokens and the current-session state
//!
//! The session answers one question for the rest of the crate: who is
//! calling right now. There are three distinct answers, see
//! [`CurrentPrincipal`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// An authenticated user as handed out by the identity subsystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Qualifies the username (user class, realm, or provider name)
    pub provider: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(provider: &str, username: &str) -> Self {
        Self {
            provider: provider.to_string(),
            username: username.to_string(),
            roles: Vec::new(),
        }
    }

    /// Add a role to the principal
    pub fn with_role(mut self, role: &str) -> Self {
        if !self.has_role(role) {
            self.roles.push(role.to_string());
        }
        self
    }

    pub fn with_roles(self, roles: &[&str]) -> Self {
        roles.iter().fold(self, |p, r| p.with_role(r))
    }

    #[inline]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A role value from the identity subsystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn new(name: &str) -> Self {
        Role(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Authentication token wrapping a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub principal: Principal,
    pub authenticated: bool,
}

impl Token {
    pub fn authenticated(principal: Principal) -> Self {
        Self { principal, authenticated: true }
    }

    pub fn unauthenticated(principal: Principal) -> Self {
        Self { principal, authenticated: false }
    }
}

/// Who is calling right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentPrincipal {
    /// There is no session at all
    NoSession,
    /// A session exists but nobody is authenticated in it
    Anonymous,
    Principal(Principal),
}

impl CurrentPrincipal {
    /// The authenticated principal, if any
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            CurrentPrincipal::Principal(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentPrincipal::Principal(_))
    }
}

/// Source of the current principal
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> CurrentPrincipal;
}

/// Session state held in memory, switched explicitly by the embedding code
#[derive(Debug, Default)]
pub struct SessionStore {
    token: RwLock<Option<Token>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate `principal` as the current caller
    pub fn login(&self, principal: Principal) {
        tracing::debug!(user = %principal.username, "session login");
        *self.token.write() = Some(Token::authenticated(principal));
    }

    pub fn set_token(&self, token: Token) {
        *self.token.write() = Some(token);
    }

    /// Keep the session but drop authentication
    pub fn anonymous(&self) {
        let mut token = self.token.write();
        match token.as_mut() {
            Some(t) => t.authenticated = false,
            None => *token = Some(Token::unauthenticated(Principal::new("", "anon."))),
        }
    }

    /// End the session entirely
    pub fn logout(&self) {
        *self.token.write() = None;
    }

    pub fn token(&self) -> Option<Token> {
        self.token.read().clone()
    }
}

impl SessionProvider for SessionStore {
    fn current(&self) -> CurrentPrincipal {
        match self.token.read().as_ref() {
            None => CurrentPrincipal::NoSession,
            Some(t) if !t.authenticated => CurrentPrincipal::Anonymous,
            Some(t) => CurrentPrincipal::Principal(t.principal.clone()),
        }
    }
}
