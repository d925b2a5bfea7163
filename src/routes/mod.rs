//! HTTP routes for the gateway

pub mod api;
pub mod auth_routes;
pub mod health;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use serde_json::Value;

use crate::types::{GatewayError, Result};

pub use api::{handle_api_request, RELAY_PREFIX};
pub use auth_routes::handle_auth_request;
pub use health::{gateway_info, health_check};

/// Collect a request body
pub(crate) async fn read_body<B>(body: B) -> Result<Bytes>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| GatewayError::BadRequest(format!("Failed to read request body: {}", e)))
}

/// Parse a JSON request body; an empty body is `{}`
pub(crate) fn parse_json_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_body() {
        assert_eq!(parse_json_body(b"").unwrap(), json!({}));
        assert_eq!(parse_json_body(b"  \n").unwrap(), json!({}));
        assert_eq!(parse_json_body(br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert!(matches!(
            parse_json_body(b"{nope"),
            Err(GatewayError::BadRequest(_))
        ));
    }
}
