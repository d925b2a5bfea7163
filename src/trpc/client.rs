//! Protocol client: managed session + bounded retry on 401

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::request::{CallKind, RpcRequest};
use super::transport::Transport;
use crate::session::TokenSource;
use crate::types::{GatewayError, Result};

/// Procedure used to check that a session credential is still accepted
pub const GET_USER_PROCEDURE: &str = "auth.getUser";

/// Bounded retry policy for managed calls.
///
/// The only retryable failure is an upstream 401 (expired or revoked
/// session). Attempts are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RetryPolicy {
    /// Whether a failure on `attempt` should be followed by another attempt
    pub fn should_retry(&self, attempt: u32, err: &GatewayError) -> bool {
        attempt < self.max_attempts && err.is_session_rejected()
    }
}

/// Entry point for everything that relays a call upstream
pub struct ProtocolClient {
    transport: Arc<dyn Transport>,
    session: Arc<dyn TokenSource>,
    policy: RetryPolicy,
}

impl ProtocolClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<dyn TokenSource>) -> Self {
        Self {
            transport,
            session,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call a procedure with the managed session token.
    ///
    /// On a 401 the token is invalidated and the call repeated with a fresh
    /// one, up to `policy.max_attempts` round trips in total.
    pub async fn call(&self, procedure: &str, input: Value, kind: CallKind) -> Result<Value> {
        let request = RpcRequest::new(procedure, input, kind);
        let mut attempt = 1;

        loop {
            let token = self.session.token().await?;

            match self.transport.send(&request, Some(token.as_str())).await {
                Ok(reply) => return Ok(reply.payload),
                Err(err) if self.policy.should_retry(attempt, &err) => {
                    warn!(
                        procedure,
                        attempt, "Session rejected by upstream, re-authenticating"
                    );
                    self.session.invalidate().await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn query(&self, procedure: &str, input: Value) -> Result<Value> {
        self.call(procedure, input, CallKind::Query).await
    }

    pub async fn mutation(&self, procedure: &str, input: Value) -> Result<Value> {
        self.call(procedure, input, CallKind::Mutation).await
    }

    /// Call a procedure with a caller-supplied credential.
    ///
    /// Bypasses the managed session entirely and never retries.
    pub async fn call_as(
        &self,
        token: &str,
        procedure: &str,
        input: Value,
        kind: CallKind,
    ) -> Result<Value> {
        let request = RpcRequest::new(procedure, input, kind);
        let reply = self.transport.send(&request, Some(token)).await?;
        Ok(reply.payload)
    }

    /// Check a credential against `auth.getUser`, returning the user on success
    pub async fn check_session(&self, token: &str) -> Result<Value> {
        debug!("Validating session credential");
        self.call_as(token, GET_USER_PROCEDURE, Value::Object(Default::default()), CallKind::Query)
            .await
    }
}
