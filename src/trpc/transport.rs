//! Transport call: one HTTP round trip to `/api/trpc/<procedure>`

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::envelope::{decode, Decoded};
use super::normalize::normalize;
use super::request::{CallKind, RpcRequest};
use super::SESSION_COOKIE;
use crate::types::{GatewayError, Result};

/// Decoded reply of a successful call
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// Payload unwrapped from `result.data.json`
    pub payload: Value,
    /// Response headers (login reads `Set-Cookie` from here)
    pub headers: HeaderMap,
}

/// Performs a single remote procedure round trip.
///
/// `token` is attached as a credential when present. Implementations never
/// retry; failures come back as [`GatewayError::Upstream`] (normalized),
/// [`GatewayError::Transport`] or [`GatewayError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RpcRequest, token: Option<&str>) -> Result<TransportReply>;
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Upstream base URL, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn procedure_url(&self, procedure: &str) -> String {
        format!("{}/api/trpc/{}", self.base_url, procedure)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RpcRequest, token: Option<&str>) -> Result<TransportReply> {
        let url = self.procedure_url(&request.procedure);

        let mut builder = match request.kind {
            CallKind::Query => {
                let input = request.wire_input().to_string();
                self.client
                    .get(format!("{}?input={}", url, urlencoding::encode(&input)))
            }
            CallKind::Mutation => self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(request.wire_input().to_string()),
        };

        if let Some(token) = token {
            builder = builder
                .header(COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .header(AUTHORIZATION, format!("Bearer {}", token));
        }

        debug!(
            procedure = %request.procedure,
            kind = request.kind.as_str(),
            authenticated = token.is_some(),
            "tRPC call"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.procedure, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.procedure, e))?;

        match decode(status, &body) {
            Decoded::Success(payload) => {
                debug!(procedure = %request.procedure, "tRPC call OK");
                Ok(TransportReply { payload, headers })
            }
            Decoded::Failure(failure) => {
                let err = normalize(&request.procedure, status, &failure);
                warn!(
                    procedure = %request.procedure,
                    http_status = status.as_u16(),
                    status = err.status,
                    raw = err.raw_body.as_deref().unwrap_or(""),
                    "tRPC call failed: {}",
                    err.message
                );
                Err(err.into())
            }
        }
    }
}

fn transport_error(procedure: &str, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            procedure: procedure.to_string(),
        }
    } else {
        GatewayError::Transport {
            procedure: procedure.to_string(),
            message: err.to_string(),
        }
    }
}
