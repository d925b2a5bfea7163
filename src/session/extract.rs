//! Session token extraction from an `auth.login` reply

use reqwest::header::{HeaderMap, SET_COOKIE};
use serde_json::Value;

use crate::trpc::SESSION_COOKIE;

/// Body fields that may carry the token, in precedence order
const BODY_TOKEN_FIELDS: [&str; 2] = ["token", "ezToken"];

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    /// `token` / `ezToken` field of the decoded body
    Body,
    /// The first `Set-Cookie` header
    Cookie,
    /// One of several `Set-Cookie` headers
    CookieList,
}

impl TokenOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "response body",
            Self::Cookie => "Set-Cookie header",
            Self::CookieList => "Set-Cookie header list",
        }
    }
}

/// Extract the session token from a login reply.
///
/// Tried in order: body field, first `Set-Cookie` header, then every
/// `Set-Cookie` header.
pub fn extract_token(body: &Value, headers: &HeaderMap) -> Option<(String, TokenOrigin)> {
    if let Some(token) = token_from_body(body) {
        return Some((token, TokenOrigin::Body));
    }

    if let Some(token) = headers
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(cookie_value)
    {
        return Some((token, TokenOrigin::Cookie));
    }

    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(cookie_value)
        .map(|token| (token, TokenOrigin::CookieList))
}

fn token_from_body(body: &Value) -> Option<String> {
    BODY_TOKEN_FIELDS.iter().find_map(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Value of the session cookie inside a `Set-Cookie` (or joined) header value
pub fn cookie_value(header: &str) -> Option<String> {
    let needle = format!("{}=", SESSION_COOKIE);

    header.match_indices(&needle).find_map(|(idx, _)| {
        let at_boundary = header[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| c == ' ' || c == ';' || c == ',');
        if !at_boundary {
            return None;
        }

        let rest = &header[idx + needle.len()..];
        let value = rest.split(';').next().unwrap_or("").trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
