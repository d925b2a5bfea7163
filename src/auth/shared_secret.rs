//! Shared secret guard for inbound callers
//!
//! External callers authenticate with `Authorization: Bearer <API_SECRET>`.
//! This is independent of the upstream session, which the gateway manages
//! on its own. With no secret configured the gateway is open (dev mode).

use crate::types::{GatewayError, Result};

/// Validates the static shared secret on inbound requests
#[derive(Debug, Clone)]
pub struct SharedSecretGuard {
    secret: Option<String>,
}

impl SharedSecretGuard {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Whether a secret is required
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the raw `Authorization` header value of an inbound request
    pub fn check(&self, authorization: Option<&str>) -> Result<()> {
        let Some(ref secret) = self.secret else {
            return Ok(());
        };

        let presented = bearer_token(authorization).ok_or_else(|| {
            GatewayError::UnauthorizedExternal(
                "Missing Authorization: Bearer <API_SECRET>".to_string(),
            )
        })?;

        if constant_time_compare(presented, secret) {
            Ok(())
        } else {
            Err(GatewayError::UnauthorizedExternal(
                "Invalid API secret".to_string(),
            ))
        }
    }
}

/// Extract the credential from a `Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
