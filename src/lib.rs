//! Easypanel Gateway - REST relay for the Easypanel tRPC API
//!
//! The gateway logs into Easypanel with its own account and keeps that
//! session alive on behalf of every caller. External callers authenticate
//! with a static shared secret instead of Easypanel credentials.
//!
//! ## Components
//!
//! - **trpc**: transport, envelope decoding, error normalization, and the
//!   protocol client with its retry-once-on-401 policy
//! - **session**: single cached session token with single-flight login
//! - **auth**: shared secret guard for inbound callers
//! - **server** / **routes**: hyper HTTP surface

pub mod auth;
pub mod config;
pub mod routes;
pub mod server;
pub mod session;
pub mod trpc;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
