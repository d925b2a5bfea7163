//! tRPC response envelopes
//!
//! Success: `{ "result": { "data": { "json": <payload> } } }`
//!
//! Failure: `{ "error": { "message", "code", "data": { "code", "httpStatus", "path" } } }`
//!
//! Decoding is strict first (typed envelopes), then lenient: anything that
//! does not fit a known shape is kept as a raw string for diagnostics.

use hyper::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct SuccessEnvelope {
    result: ResultBody,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    data: DataBody,
}

#[derive(Debug, Deserialize)]
struct DataBody {
    #[serde(default)]
    json: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: TrpcError,
}

/// Error object declared by the upstream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrpcError {
    pub message: Option<String>,
    /// JSON-RPC style numeric code (e.g. -32001)
    pub code: Option<i64>,
    pub data: Option<TrpcErrorData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrpcErrorData {
    /// tRPC error code name (e.g. `UNAUTHORIZED`)
    pub code: Option<String>,
    pub http_status: Option<u16>,
    pub path: Option<String>,
}

impl TrpcError {
    /// Pick out whatever fields are usable from an error object whose shape
    /// did not deserialize cleanly (e.g. a string `code`).
    fn from_loose(error: &Value) -> Option<Self> {
        let error = error.as_object()?;
        let data = error.get("data").and_then(Value::as_object);

        Some(Self {
            message: error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            code: error.get("code").and_then(Value::as_i64),
            data: data.map(|data| TrpcErrorData {
                code: data.get("code").and_then(Value::as_str).map(str::to_string),
                http_status: data
                    .get("httpStatus")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok()),
                path: data.get("path").and_then(Value::as_str).map(str::to_string),
            }),
        })
    }
}

/// Body of a failed call
#[derive(Debug, Clone)]
pub enum FailureBody {
    /// The body matched the tRPC error envelope
    Structured { error: TrpcError, raw: String },
    /// Anything else: non-JSON, unexpected JSON shape, empty body
    Raw(String),
}

impl FailureBody {
    pub fn raw(&self) -> &str {
        match self {
            Self::Structured { raw, .. } => raw,
            Self::Raw(raw) => raw,
        }
    }

    pub fn declared(&self) -> Option<&TrpcError> {
        match self {
            Self::Structured { error, .. } => Some(error),
            Self::Raw(_) => None,
        }
    }
}

/// Tagged result of decoding one upstream response
#[derive(Debug, Clone)]
pub enum Decoded {
    Success(Value),
    Failure(FailureBody),
}

/// Decode a response body given its HTTP status.
///
/// A response is a failure when the status is not 2xx, when the body carries
/// a top-level `error` key, when it is not JSON, or when a 2xx body lacks the
/// `result.data` envelope.
pub fn decode(status: StatusCode, body: &[u8]) -> Decoded {
    let raw = String::from_utf8_lossy(body).into_owned();

    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return Decoded::Failure(FailureBody::Raw(raw)),
    };

    if !status.is_success() || value.get("error").is_some() {
        let declared = match serde_json::from_value::<ErrorEnvelope>(value.clone()) {
            Ok(envelope) => Some(envelope.error),
            Err(_) => value.get("error").and_then(TrpcError::from_loose),
        };
        let failure = match declared {
            Some(error) => FailureBody::Structured { error, raw },
            None => FailureBody::Raw(raw),
        };
        return Decoded::Failure(failure);
    }

    match serde_json::from_value::<SuccessEnvelope>(value) {
        Ok(envelope) => Decoded::Success(envelope.result.data.json),
        Err(_) => Decoded::Failure(FailureBody::Raw(raw)),
    }
}
