//! tRPC protocol layer
//!
//! Easypanel exposes its internal API as tRPC procedures. This module speaks
//! that protocol directly over HTTP:
//!
//! - `request`: procedure descriptors (query vs mutation)
//! - `envelope`: strict-then-lenient response decoding
//! - `normalize`: failure → `UpstreamError`
//! - `transport`: one round trip (`Transport` trait, reqwest implementation)
//! - `client`: managed session and retry-once-on-401

pub mod client;
pub mod envelope;
pub mod normalize;
pub mod request;
pub mod transport;

/// Cookie name the upstream uses for its session token
pub const SESSION_COOKIE: &str = "ez-token";

pub use client::{ProtocolClient, RetryPolicy, GET_USER_PROCEDURE};
pub use envelope::{decode, Decoded, FailureBody, TrpcError, TrpcErrorData};
pub use normalize::{normalize, UpstreamError, RAW_BODY_LIMIT};
pub use request::{validate_procedure, CallKind, RpcRequest};
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportReply};
