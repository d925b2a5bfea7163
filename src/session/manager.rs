//! Session token lifecycle manager
//!
//! Owns the single upstream session for the whole gateway. External callers
//! never see Easypanel credentials; they only ever cause this manager to log
//! in (lazily) with the configured identity.
//!
//! State machine: `Absent → (login) → Valid → (window elapses | invalidate) → Absent`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::extract::extract_token;
use super::{SessionToken, TokenSource};
use crate::trpc::{RpcRequest, Transport};
use crate::types::{GatewayError, Result};

/// Upstream procedure used to obtain a session
pub const LOGIN_PROCEDURE: &str = "auth.login";

/// Default freshness window for a cached token (1 hour).
///
/// This is a local policy, not a server-declared expiry.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Identity used to log into the upstream
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Both values must be present and non-empty
    pub fn from_parts(email: Option<String>, password: Option<String>) -> Option<Self> {
        match (email, password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Self { email, password })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration for the session manager
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Option<Credentials>,
    /// How long a token is reused before a fresh login
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: SessionToken,
    expires_at: Instant,
}

/// Snapshot of the session for health reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub credentials_configured: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
}

/// Caches one session token and logs in when it is absent or stale
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    cached: RwLock<Option<CachedToken>>,
    /// Single-flight guard: only one login runs at a time. Holds the error
    /// of the last completed login, if it failed.
    logging_in: Mutex<Option<GatewayError>>,
    /// Bumped each time a login completes, successful or not
    login_generation: AtomicU64,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        info!(
            credentials = config.credentials.is_some(),
            ttl_secs = config.ttl.as_secs(),
            "SessionManager created"
        );

        Self {
            transport,
            config,
            cached: RwLock::new(None),
            logging_in: Mutex::new(None),
            login_generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Get a valid token, logging in if needed.
    ///
    /// Concurrent callers that find no valid token wait for a single login
    /// and share its outcome, including its error, instead of each issuing
    /// their own.
    pub async fn get(&self) -> Result<SessionToken> {
        // Fast path: fresh cached token
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let seen = self.login_generation.load(Ordering::SeqCst);

        // Slow path: need to log in
        let mut last_error = self.logging_in.lock().await;

        // Double-check after acquiring lock
        if let Some(token) = self.cached_token().await {
            debug!("Reusing token from concurrent login");
            return Ok(token);
        }

        // A login finished while we waited and it failed
        if self.login_generation.load(Ordering::SeqCst) != seen {
            if let Some(err) = last_error.as_ref() {
                debug!("Sharing error from concurrent login");
                return Err(err.clone());
            }
        }

        let outcome = self.login().await;
        self.login_generation.fetch_add(1, Ordering::SeqCst);

        let token = match outcome {
            Ok(token) => {
                *last_error = None;
                token
            }
            Err(err) => {
                *last_error = Some(err.clone());
                return Err(err);
            }
        };

        {
            let mut cached = self.cached.write().await;
            *cached = Some(CachedToken {
                token: token.clone(),
                expires_at: Instant::now() + self.config.ttl,
            });
        }

        info!("Authenticated with Easypanel");
        Ok(token)
    }

    /// Log in with the configured credentials and extract the token.
    ///
    /// Does not touch the cache; [`get`](Self::get) stores the result.
    pub async fn login(&self) -> Result<SessionToken> {
        let credentials = self.config.credentials.as_ref().ok_or_else(|| {
            GatewayError::AuthConfig(
                "EASYPANEL_EMAIL and EASYPANEL_PASSWORD must be set".to_string(),
            )
        })?;

        info!(email = %credentials.email, "Logging into Easypanel");

        let request = RpcRequest::mutation(
            LOGIN_PROCEDURE,
            json!({ "email": credentials.email, "password": credentials.password }),
        );
        let reply = self.transport.send(&request, None).await?;

        match extract_token(&reply.payload, &reply.headers) {
            Some((token, origin)) => {
                debug!(origin = origin.as_str(), "Got session token");
                Ok(SessionToken::new(token))
            }
            None => {
                let body = reply.payload.to_string();
                let set_cookie: Vec<&str> = reply
                    .headers
                    .get_all(reqwest::header::SET_COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect();
                warn!(body = %body, set_cookie = ?set_cookie, "Login reply carried no session token");
                Err(GatewayError::LoginFailure(
                    "Login succeeded but could not extract ez-token from response".to_string(),
                ))
            }
        }
    }

    /// Drop the cached token; the next [`get`](Self::get) logs in again
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if cached.take().is_some() {
            debug!("Session token invalidated");
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let cached = self.cached.read().await;
        let now = Instant::now();
        let remaining = cached
            .as_ref()
            .filter(|c| now < c.expires_at)
            .map(|c| c.expires_at.duration_since(now).as_secs());

        SessionStatus {
            credentials_configured: self.config.credentials.is_some(),
            authenticated: remaining.is_some(),
            expires_in_secs: remaining,
        }
    }

    async fn cached_token(&self) -> Option<SessionToken> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|c| Instant::now() < c.expires_at)
            .map(|c| c.token.clone())
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn token(&self) -> Result<SessionToken> {
        self.get().await
    }

    async fn invalidate(&self) {
        SessionManager::invalidate(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trpc::{TransportReply, UpstreamError};
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every login with `tok-<n>` in the body, counting calls
    #[derive(Default)]
    struct LoginCounter {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl LoginCounter {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for LoginCounter {
        async fn send(&self, request: &RpcRequest, token: Option<&str>) -> Result<TransportReply> {
            assert_eq!(request.procedure, LOGIN_PROCEDURE);
            assert!(token.is_none(), "login must be unauthenticated");
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(TransportReply {
                payload: json!({ "token": format!("tok-{}", n) }),
                headers: HeaderMap::new(),
            })
        }
    }

    /// Returns a fixed reply body and headers
    struct FixedReply {
        payload: Value,
        headers: HeaderMap,
    }

    #[async_trait]
    impl Transport for FixedReply {
        async fn send(&self, _request: &RpcRequest, _token: Option<&str>) -> Result<TransportReply> {
            Ok(TransportReply {
                payload: self.payload.clone(),
                headers: self.headers.clone(),
            })
        }
    }

    struct FailingLogin;

    #[async_trait]
    impl Transport for FailingLogin {
        async fn send(&self, request: &RpcRequest, _token: Option<&str>) -> Result<TransportReply> {
            Err(GatewayError::Upstream(UpstreamError {
                message: "Invalid credentials".into(),
                status: 401,
                procedure: request.procedure.clone(),
                code: Some("UNAUTHORIZED".into()),
                raw_body: None,
            }))
        }
    }

    /// Counts logins; each one stalls then times out
    #[derive(Default)]
    struct StalledLogin {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for StalledLogin {
        async fn send(&self, request: &RpcRequest, _token: Option<&str>) -> Result<TransportReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(GatewayError::Timeout {
                procedure: request.procedure.clone(),
            })
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            credentials: Credentials::from_parts(
                Some("admin@example.com".into()),
                Some("hunter2".into()),
            ),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(Credentials::from_parts(Some("a@b.c".into()), Some("pw".into())).is_some());
        assert!(Credentials::from_parts(Some("a@b.c".into()), None).is_none());
        assert!(Credentials::from_parts(None, Some("pw".into())).is_none());
        assert!(Credentials::from_parts(Some("".into()), Some("pw".into())).is_none());

        let creds = Credentials::from_parts(Some("a@b.c".into()), Some("pw".into())).unwrap();
        assert!(!format!("{:?}", creds).contains("pw\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_token_reused_within_window() {
        let transport = Arc::new(LoginCounter::default());
        let manager = SessionManager::new(transport.clone(), config());

        let first = manager.get().await.unwrap();
        tokio::time::advance(Duration::from_secs(60 * 30)).await;
        let second = manager.get().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str(), "tok-1");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_after_window_elapses() {
        let transport = Arc::new(LoginCounter::default());
        let manager = SessionManager::new(transport.clone(), config());

        manager.get().await.unwrap();
        tokio::time::advance(DEFAULT_TOKEN_TTL + Duration::from_secs(1)).await;
        assert!(!manager.status().await.authenticated);

        let token = manager.get().await.unwrap();
        assert_eq!(token.as_str(), "tok-2");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_login() {
        let transport = Arc::new(LoginCounter::default());
        let manager = SessionManager::new(transport.clone(), config());

        manager.get().await.unwrap();
        manager.invalidate().await;
        let token = manager.get().await.unwrap();

        assert_eq!(token.as_str(), "tok-2");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_login() {
        let transport = Arc::new(LoginCounter {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let manager = Arc::new(SessionManager::new(transport.clone(), config()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            tasks.spawn(async move { manager.get().await });
        }

        while let Some(joined) = tasks.join_next().await {
            assert_eq!(joined.unwrap().unwrap().as_str(), "tok-1");
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_failed_login() {
        let transport = Arc::new(StalledLogin::default());
        let manager = Arc::new(SessionManager::new(transport.clone(), config()));
        let started = Instant::now();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            tasks.spawn(async move { manager.get().await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Err(GatewayError::Timeout { procedure }) => assert_eq!(procedure, LOGIN_PROCEDURE),
                other => panic!("expected shared timeout, got {:?}", other),
            }
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(100));

        // A later caller is not handed the stale failure
        assert!(manager.get().await.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_auth_config_error() {
        let transport = Arc::new(LoginCounter::default());
        let manager = SessionManager::new(transport.clone(), SessionConfig::default());

        for _ in 0..2 {
            let err = manager.get().await.unwrap_err();
            assert!(matches!(err, GatewayError::AuthConfig(_)));
        }
        assert_eq!(transport.calls(), 0);
        assert!(!manager.status().await.credentials_configured);
    }

    #[tokio::test]
    async fn test_cookie_token_when_body_has_none() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("ez-token=xyz; Path=/"));
        let transport = Arc::new(FixedReply {
            payload: json!({ "ok": true }),
            headers,
        });
        let manager = SessionManager::new(transport, config());

        assert_eq!(manager.get().await.unwrap().as_str(), "xyz");
    }

    #[tokio::test]
    async fn test_login_failure_caches_nothing() {
        let transport = Arc::new(FixedReply {
            payload: json!({}),
            headers: HeaderMap::new(),
        });
        let manager = SessionManager::new(transport, config());

        let err = manager.get().await.unwrap_err();
        assert!(matches!(err, GatewayError::LoginFailure(_)));
        assert!(!manager.status().await.authenticated);
    }

    #[tokio::test]
    async fn test_upstream_login_error_propagates() {
        let manager = SessionManager::new(Arc::new(FailingLogin), config());

        match manager.get().await.unwrap_err() {
            GatewayError::Upstream(e) => {
                assert_eq!(e.procedure, LOGIN_PROCEDURE);
                assert_eq!(e.status, 401);
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_reports_remaining_window() {
        let manager = SessionManager::new(Arc::new(LoginCounter::default()), config());
        assert!(!manager.status().await.authenticated);

        manager.get().await.unwrap();
        let status = manager.status().await;
        assert!(status.authenticated);
        assert!(status.expires_in_secs.unwrap() <= DEFAULT_TOKEN_TTL.as_secs());
    }
}
