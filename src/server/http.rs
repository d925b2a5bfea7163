//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use hyper::body::Body;
use hyper::header::AUTHORIZATION;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::response::{error_response, not_found_response, preflight_response, JsonResponse};
use super::AppState;
use crate::routes;
use crate::types::Result;

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Gateway listening on {}", state.args.listen);

    if !state.guard.is_configured() {
        warn!("No API_SECRET set - /api/v1/* is open (dev mode)");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle_request(state, req).await) }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route one request and log its outcome
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> JsonResponse
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = route(&state, req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{} {} -> {}",
        method,
        path,
        response.status().as_u16()
    );

    response
}

async fn route<B>(state: &AppState, req: Request<B>) -> JsonResponse
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let path = req.uri().path().to_string();

    match (req.method().clone(), path.as_str()) {
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, "/") => routes::gateway_info(state),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state).await,

        (_, p) if p.starts_with("/auth/") => routes::handle_auth_request(req, state).await,

        (_, p) if p.starts_with("/api/v1/") => {
            let authorization = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            if let Err(err) = state.guard.check(authorization) {
                warn!(path = %p, "Rejected inbound call: {}", err);
                return error_response(&err);
            }

            routes::handle_api_request(req, state).await
        }

        _ => not_found_response(&path),
    }
}
