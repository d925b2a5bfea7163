//! Error normalizer: raw upstream failure → `UpstreamError`

use hyper::StatusCode;
use serde::Serialize;

use super::envelope::FailureBody;

/// Maximum number of characters of the upstream body kept for diagnostics
pub const RAW_BODY_LIMIT: usize = 500;

/// A remote procedure failure in a stable shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{procedure} failed with HTTP {status}: {message}")]
pub struct UpstreamError {
    pub message: String,
    pub status: u16,
    pub procedure: String,
    /// tRPC error code name when the upstream declared one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Upstream body, truncated to [`RAW_BODY_LIMIT`] characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

/// Build an [`UpstreamError`] from a failed response.
///
/// Upstream-declared message and `httpStatus` win when present; otherwise the
/// transport status is used if it is an error status, and 502 if the
/// transport itself reported success.
pub fn normalize(procedure: &str, status: StatusCode, failure: &FailureBody) -> UpstreamError {
    let declared = failure.declared();

    let message = declared
        .and_then(|e| e.message.as_deref())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("tRPC call failed: {}", procedure));

    let declared_status = declared
        .and_then(|e| e.data.as_ref())
        .and_then(|d| d.http_status)
        .filter(|s| is_error_status(*s));

    let status = declared_status.unwrap_or_else(|| {
        if is_error_status(status.as_u16()) {
            status.as_u16()
        } else {
            StatusCode::BAD_GATEWAY.as_u16()
        }
    });

    let code = declared
        .and_then(|e| e.data.as_ref())
        .and_then(|d| d.code.clone());

    UpstreamError {
        message,
        status,
        procedure: procedure.to_string(),
        code,
        raw_body: truncate(failure.raw(), RAW_BODY_LIMIT),
    }
}

fn is_error_status(status: u16) -> bool {
    (400..=599).contains(&status)
}

fn truncate(raw: &str, limit: usize) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.chars().take(limit).collect())
}
