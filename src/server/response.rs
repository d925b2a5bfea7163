//! JSON response helpers

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::types::GatewayError;

pub type JsonResponse = Response<Full<Bytes>>;

/// Serialize `body` as a JSON response with CORS enabled
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> JsonResponse {
    let bytes = match serde_json::to_vec(body) {
        Ok(b) => Bytes::from(b),
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            return with_headers(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal serialization error"}"#),
            );
        }
    };
    with_headers(status, bytes)
}

fn with_headers(status: StatusCode, body: Bytes) -> JsonResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Map a [`GatewayError`] to its JSON response.
///
/// Upstream failures keep the originating procedure and, when available, the
/// upstream body (parsed as JSON if it still is, else as the raw string).
/// Everything else is `{"error": message}`; guard rejections carry the bare
/// guard message.
pub fn error_response(err: &GatewayError) -> JsonResponse {
    let mut body = Map::new();

    match err {
        GatewayError::Upstream(e) => {
            body.insert("error".into(), json!(e.message));
            body.insert("procedure".into(), json!(e.procedure));
            if let Some(raw) = &e.raw_body {
                let upstream =
                    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| json!(raw));
                body.insert("upstream".into(), upstream);
            }
        }
        GatewayError::UnauthorizedExternal(message) => {
            body.insert("error".into(), json!(message));
        }
        other => {
            body.insert("error".into(), json!(other.to_string()));
        }
    }

    json_response(err.status_code(), &Value::Object(body))
}

/// `{"error": message}` with the given status
pub fn message_response(status: StatusCode, message: &str) -> JsonResponse {
    json_response(status, &json!({ "error": message }))
}

pub fn not_found_response(path: &str) -> JsonResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({ "error": "Not Found", "path": path }),
    )
}

pub fn method_not_allowed_response(path: &str) -> JsonResponse {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "error": "Method Not Allowed", "path": path }),
    )
}

/// CORS preflight response
pub fn preflight_response() -> JsonResponse {
    let mut response = with_headers(StatusCode::NO_CONTENT, Bytes::new());
    let headers = response.headers_mut();
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trpc::UpstreamError;
    use http_body_util::BodyExt;

    async fn body_json(response: JsonResponse) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upstream_error_shape() {
        let err = GatewayError::Upstream(UpstreamError {
            message: "Project not found".into(),
            status: 404,
            procedure: "projects.inspectProject".into(),
            code: Some("NOT_FOUND".into()),
            raw_body: Some(r#"{"error":{"message":"Project not found"}}"#.into()),
        });

        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "Project not found");
        assert_eq!(body["procedure"], "projects.inspectProject");
        assert_eq!(body["upstream"]["error"]["message"], "Project not found");
    }

    #[tokio::test]
    async fn test_truncated_upstream_body_kept_as_string() {
        let err = GatewayError::Upstream(UpstreamError {
            message: "boom".into(),
            status: 500,
            procedure: "a.b".into(),
            code: None,
            raw_body: Some(r#"{"error":{"mess"#.into()),
        });
        let body = body_json(error_response(&err)).await;
        assert_eq!(body["upstream"], r#"{"error":{"mess"#);
    }

    #[tokio::test]
    async fn test_guard_rejection_is_bare_message() {
        let err = GatewayError::UnauthorizedExternal("Invalid API secret".into());
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "Invalid API secret" }));
    }

    #[tokio::test]
    async fn test_other_errors_have_message_only() {
        let err = GatewayError::Timeout {
            procedure: "monitor.getSystemStats".into(),
        };
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({ "error": "Timed out calling monitor.getSystemStats" })
        );
    }
}
