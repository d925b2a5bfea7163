//! HTTP server and shared application state

pub mod http;
pub mod response;

use std::sync::Arc;
use std::time::Instant;

use crate::auth::SharedSecretGuard;
use crate::config::Args;
use crate::session::SessionManager;
use crate::trpc::{HttpTransport, ProtocolClient, Transport};
use crate::types::Result;

pub use http::{handle_request, run};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Raw transport, used directly by the auth pass-through routes
    pub transport: Arc<dyn Transport>,
    /// The gateway's own upstream session
    pub session: Arc<SessionManager>,
    /// Managed-session client used by the relay
    pub client: Arc<ProtocolClient>,
    /// Shared secret check for /api/v1/*
    pub guard: SharedSecretGuard,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with an HTTP transport pointed at `EASYPANEL_URL`
    pub fn new(args: Args) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(args.transport_config())?);
        Ok(Self::with_transport(args, transport))
    }

    /// Build state around an existing transport
    pub fn with_transport(args: Args, transport: Arc<dyn Transport>) -> Self {
        let session = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            args.session_config(),
        ));
        let client = Arc::new(ProtocolClient::new(
            Arc::clone(&transport),
            Arc::clone(&session) as Arc<dyn crate::session::TokenSource>,
        ));
        let guard = SharedSecretGuard::new(args.api_secret.clone());

        Self {
            args,
            transport,
            session,
            client,
            guard,
            started_at: Instant::now(),
        }
    }
}
