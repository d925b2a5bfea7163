//! Auth pass-through routes
//!
//! These are public (no shared secret) and operate on the caller's own
//! Easypanel credentials, never on the gateway's managed session:
//!
//! - `POST /auth/login` - email + password → ez-token
//! - `GET /auth/check` - verify a Bearer ez-token via `auth.getUser`
//! - `POST /auth/api-token` - generate a long-lived API token

use hyper::body::Body;
use hyper::header::AUTHORIZATION;
use hyper::{Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{parse_json_body, read_body};
use crate::auth::bearer_token;
use crate::server::response::{
    error_response, json_response, message_response, not_found_response, JsonResponse,
};
use crate::server::AppState;
use crate::session::{extract_token, LOGIN_PROCEDURE};
use crate::trpc::{CallKind, RpcRequest};
use crate::types::{GatewayError, Result};

const GENERATE_API_TOKEN_PROCEDURE: &str = "users.generateApiToken";

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Route a `/auth/*` request
pub async fn handle_auth_request<B>(req: Request<B>, state: &AppState) -> JsonResponse
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let path = req.uri().path().to_string();

    match (req.method().clone(), path.as_str()) {
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/check") => handle_check(req, state).await,
        (Method::POST, "/auth/api-token") => handle_api_token(req, state).await,
        _ => not_found_response(&path),
    }
}

async fn handle_login<B>(req: Request<B>, state: &AppState) -> JsonResponse
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let login = match parse_login(req).await {
        Ok(l) => l,
        Err(err) => return error_response(&err),
    };

    let request = RpcRequest::mutation(
        LOGIN_PROCEDURE,
        json!({ "email": login.email, "password": login.password }),
    );

    let reply = match state.transport.send(&request, None).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!(email = %login.email, "Caller login rejected: {}", err);
            return message_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
        }
    };

    match extract_token(&reply.payload, &reply.headers) {
        Some((token, origin)) => {
            info!(email = %login.email, origin = origin.as_str(), "Caller logged in");
            json_response(
                StatusCode::OK,
                &json!({ "token": token, "message": "Login successful" }),
            )
        }
        None => {
            warn!(email = %login.email, "Caller login reply carried no ez-token");
            message_response(StatusCode::UNAUTHORIZED, "Invalid email or password")
        }
    }
}

async fn parse_login<B>(req: Request<B>) -> Result<LoginRequest>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = read_body(req.into_body()).await?;
    let login: LoginRequest = serde_json::from_value(parse_json_body(&body)?)?;

    if !login.email.contains('@') {
        return Err(GatewayError::BadRequest("email must be an email address".into()));
    }
    if login.password.is_empty() {
        return Err(GatewayError::BadRequest("password must not be empty".into()));
    }
    Ok(login)
}

async fn handle_check<B>(req: Request<B>, state: &AppState) -> JsonResponse {
    let Some(token) = caller_token(&req) else {
        return message_response(StatusCode::UNAUTHORIZED, "Missing Bearer token");
    };

    match state.client.check_session(&token).await {
        Ok(user) => json_response(StatusCode::OK, &json!({ "valid": true, "user": user })),
        Err(GatewayError::Upstream(err)) => {
            debug!(status = err.status, "Caller token rejected: {}", err.message);
            message_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
        }
        Err(err) => error_response(&err),
    }
}

async fn handle_api_token<B>(req: Request<B>, state: &AppState) -> JsonResponse {
    let Some(token) = caller_token(&req) else {
        return message_response(StatusCode::UNAUTHORIZED, "Login first, then use Bearer token");
    };

    match state
        .client
        .call_as(
            &token,
            GENERATE_API_TOKEN_PROCEDURE,
            json!({}),
            CallKind::Mutation,
        )
        .await
    {
        Ok(data) => {
            let token = match data.get("token") {
                Some(Value::String(t)) => Value::String(t.clone()),
                _ => data,
            };
            json_response(StatusCode::OK, &json!({ "token": token }))
        }
        Err(err) => error_response(&err),
    }
}

fn caller_token<B>(req: &Request<B>) -> Option<String> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    bearer_token(header).map(str::to_string)
}
