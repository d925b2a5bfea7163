//! Generic tRPC relay
//!
//! - `GET  /api/v1/trpc/<procedure>?input=<urlencoded JSON>` → query
//! - `POST /api/v1/trpc/<procedure>` with a JSON body → mutation
//!
//! Inputs and results are opaque JSON. The shared secret guard runs before
//! these handlers.

use hyper::body::Body;
use hyper::{Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{parse_json_body, read_body};
use crate::server::response::{
    error_response, json_response, method_not_allowed_response, not_found_response, JsonResponse,
};
use crate::server::AppState;
use crate::trpc::{validate_procedure, CallKind};
use crate::types::{GatewayError, Result};

pub const RELAY_PREFIX: &str = "/api/v1/trpc/";

/// Handle an `/api/v1/*` request that has passed the guard
pub async fn handle_api_request<B>(req: Request<B>, state: &AppState) -> JsonResponse
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let path = req.uri().path().to_string();

    let Some(procedure) = path.strip_prefix(RELAY_PREFIX).map(str::to_string) else {
        return not_found_response(&path);
    };

    let kind = match *req.method() {
        Method::GET => CallKind::Query,
        Method::POST => CallKind::Mutation,
        _ => return method_not_allowed_response(&path),
    };

    match relay(req, state, &procedure, kind).await {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!(procedure = %procedure, status = status.as_u16(), "Relay failed: {}", err);
            } else {
                warn!(procedure = %procedure, status = status.as_u16(), "Relay failed: {}", err);
            }
            error_response(&err)
        }
    }
}

async fn relay<B>(req: Request<B>, state: &AppState, procedure: &str, kind: CallKind) -> Result<Value>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    validate_procedure(procedure)?;

    let input = match kind {
        CallKind::Query => query_input(req.uri().query())?,
        CallKind::Mutation => {
            let body = read_body(req.into_body()).await?;
            parse_json_body(&body)?
        }
    };

    debug!(procedure, kind = kind.as_str(), "Relaying call");
    state.client.call(procedure, input, kind).await
}

#[derive(Debug, Default, Deserialize)]
struct RelayQuery {
    input: Option<String>,
}

/// Decode the `input` query parameter; absent means `{}`
fn query_input(query: Option<&str>) -> Result<Value> {
    let params: RelayQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| GatewayError::BadRequest(format!("Invalid query parameters: {}", e)))?;

    match params.input {
        Some(input) => parse_json_body(input.as_bytes()),
        None => Ok(Value::Object(Default::default())),
    }
}
