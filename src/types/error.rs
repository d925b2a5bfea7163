//! Error types for the gateway

use hyper::StatusCode;

use crate::trpc::UpstreamError;

/// Main error type for gateway operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Login credentials are not configured; nothing to retry until the
    /// configuration is fixed.
    #[error("Auth configuration error: {0}")]
    AuthConfig(String),

    /// `auth.login` succeeded but no session token could be extracted.
    #[error("Login failure: {0}")]
    LoginFailure(String),

    /// A remote procedure failed with a structured status and message.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Inbound caller failed the shared secret check.
    #[error("Unauthorized: {0}")]
    UnauthorizedExternal(String),

    /// Network failure reaching the upstream service.
    #[error("Transport error calling {procedure}: {message}")]
    Transport { procedure: String, message: String },

    /// Outbound call exceeded the configured request timeout.
    #[error("Timed out calling {procedure}")]
    Timeout { procedure: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::LoginFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Upstream(err) => {
                StatusCode::from_u16(err.status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UnauthorizedExternal(_) => StatusCode::UNAUTHORIZED,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the upstream rejected the session credential (HTTP 401).
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, Self::Upstream(err) if err.status == StatusCode::UNAUTHORIZED.as_u16())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: u16) -> GatewayError {
        GatewayError::Upstream(UpstreamError {
            message: "nope".into(),
            status,
            procedure: "projects.listProjects".into(),
            code: None,
            raw_body: None,
        })
    }

    #[test]
    fn test_upstream_status_is_preserved() {
        assert_eq!(upstream(404).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(upstream(401).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(upstream(42).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_session_rejected_only_for_upstream_401() {
        assert!(upstream(401).is_session_rejected());
        assert!(!upstream(403).is_session_rejected());
        assert!(!GatewayError::UnauthorizedExternal("x".into()).is_session_rejected());
    }

    #[test]
    fn test_local_failures_status() {
        let timeout = GatewayError::Timeout { procedure: "auth.login".into() };
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        let transport = GatewayError::Transport {
            procedure: "auth.login".into(),
            message: "connection refused".into(),
        };
        assert_eq!(transport.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            GatewayError::AuthConfig("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
