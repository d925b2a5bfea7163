//! Upstream session management
//!
//! The gateway keeps exactly one Easypanel session per process. It is never
//! persisted; a restart simply logs in again on the first call.

pub mod extract;
pub mod manager;

use async_trait::async_trait;
use std::fmt;

use crate::types::Result;

pub use extract::{cookie_value, extract_token, TokenOrigin};
pub use manager::{
    Credentials, SessionConfig, SessionManager, SessionStatus, DEFAULT_TOKEN_TTL, LOGIN_PROCEDURE,
};

/// Opaque upstream session credential.
///
/// Handed out by value; the manager replaces its cache slot rather than
/// mutating a token a caller may still hold.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Source of session tokens for the protocol client
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A token believed to be valid
    async fn token(&self) -> Result<SessionToken>;

    /// Forget the current token so the next `token()` fetches a new one
    async fn invalidate(&self);
}
