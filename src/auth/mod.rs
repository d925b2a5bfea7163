//! Inbound authentication
//!
//! Provides the shared secret guard for `/api/v1/*` and bearer header parsing
//! for the auth pass-through routes.

pub mod shared_secret;

pub use shared_secret::{bearer_token, SharedSecretGuard};
