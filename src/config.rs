//! Configuration for the gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::session::{Credentials, SessionConfig};
use crate::trpc::HttpTransportConfig;

/// Easypanel Gateway - REST relay for the Easypanel tRPC API
#[derive(Parser, Debug, Clone)]
#[command(name = "easypanel-gateway")]
#[command(about = "Authenticated REST relay for the Easypanel tRPC API")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3100")]
    pub listen: SocketAddr,

    /// Public URL of this gateway, used in the root info response
    #[arg(long, env = "APP_URL")]
    pub app_url: Option<String>,

    /// Easypanel base URL (tRPC procedures live under /api/trpc)
    #[arg(long, env = "EASYPANEL_URL", default_value = "http://localhost:3000")]
    pub easypanel_url: String,

    /// Email of the Easypanel account the gateway logs in as
    #[arg(long, env = "EASYPANEL_EMAIL")]
    pub easypanel_email: Option<String>,

    /// Password of the Easypanel account
    #[arg(long, env = "EASYPANEL_PASSWORD", hide_env_values = true)]
    pub easypanel_password: Option<String>,

    /// Shared secret inbound callers must present as a Bearer token.
    /// When unset, /api/v1/* is open (dev mode).
    #[arg(long, env = "API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Seconds a session token is reused before logging in again
    #[arg(long, env = "TOKEN_TTL_SECS", default_value = "3600")]
    pub token_ttl_secs: u64,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Public base URL (falls back to localhost on the listen port)
    pub fn public_url(&self) -> String {
        self.app_url
            .clone()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", self.listen.port()))
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url: self.easypanel_url.clone(),
            timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            credentials: Credentials::from_parts(
                self.easypanel_email.clone(),
                self.easypanel_password.clone(),
            ),
            ttl: Duration::from_secs(self.token_ttl_secs),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.easypanel_url.starts_with("http://") && !self.easypanel_url.starts_with("https://")
        {
            return Err("EASYPANEL_URL must start with http:// or https://".to_string());
        }

        if self.token_ttl_secs == 0 {
            return Err("TOKEN_TTL_SECS must be greater than zero".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}
