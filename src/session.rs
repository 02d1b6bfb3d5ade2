//! The logged-in user and their token pair.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
    Management,
    #[serde(alias = "tp_cell", alias = "tp")]
    Tpcell,
    Admin,
}

impl Role {
    /// Staff roles see the cascading roster filters.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Faculty | Self::Management | Self::Tpcell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Management => "management",
            Self::Tpcell => "tpcell",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "faculty" => Ok(Self::Faculty),
            "management" => Ok(Self::Management),
            "tpcell" | "tp_cell" | "tp" => Ok(Self::Tpcell),
            "admin" => Ok(Self::Admin),
            other => Err(PortalError::Config(format!("unknown role {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone)]
struct Credentials {
    tokens: TokenPair,
    user: Option<User>,
}

/// Process-wide session shared by every data source handle.
///
/// Cloning yields another handle to the same session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts out holding a known access token.
    pub fn with_token(access: impl Into<String>) -> Self {
        let session = Self::new();
        session.login(
            TokenPair {
                access: access.into(),
                refresh: None,
                user: None,
            },
            None,
        );
        session
    }

    /// Record a successful login. `user` wins over any user echoed in `tokens`.
    pub fn login(&self, tokens: TokenPair, user: Option<User>) {
        let user = user.or_else(|| tokens.user.clone());
        tracing::info!(role = ?user.as_ref().map(|u| u.role), "session started");
        *self.write() = Some(Credentials { tokens, user });
    }

    pub fn logout(&self) {
        if self.write().take().is_some() {
            tracing::info!("session ended");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().as_ref().and_then(|c| c.user.clone())
    }

    /// Authorization header value, when logged in.
    pub fn bearer(&self) -> Option<String> {
        self.read().as_ref().map(|c| format!("Bearer {}", c.tokens.access))
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.read().as_ref().map(|c| c.tokens.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Credentials>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credentials>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
