//! Info and health endpoints
//!
//! - `/` - gateway info and navigation
//! - `/health`, `/healthz` - liveness probe with upstream session status
//!
//! Health always returns 200 while the process runs; a missing session is
//! reported, not treated as unhealthy, since login is retried lazily.

use hyper::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::server::response::{json_response, JsonResponse};
use crate::server::AppState;
use crate::session::SessionStatus;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Uptime in seconds
    pub uptime: u64,
    pub session: SessionStatus,
}

/// GET /health
pub async fn health_check(state: &AppState) -> JsonResponse {
    let response = HealthResponse {
        status: "ok",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs(),
        session: state.session.status().await,
    };
    json_response(StatusCode::OK, &response)
}

/// GET /
pub fn gateway_info(state: &AppState) -> JsonResponse {
    let base = state.args.public_url();
    let authentication = if state.guard.is_configured() {
        "API_SECRET required - pass as Authorization: Bearer <secret>"
    } else {
        "No API_SECRET set (dev mode - no auth required)"
    };

    json_response(
        StatusCode::OK,
        &json!({
            "name": "Easypanel API Gateway",
            "version": VERSION,
            "description": "REST gateway for Easypanel - relays calls to its internal tRPC API",
            "endpoints": {
                "health": format!("{}/health", base),
                "auth_login": format!("{}/auth/login", base),
                "auth_check": format!("{}/auth/check", base),
                "api": format!("{}/api/v1/trpc/<procedure>", base),
            },
            "authentication": authentication,
        }),
    )
}
