//! Remote procedure call descriptors

use serde::Serialize;
use serde_json::Value;

use crate::types::{GatewayError, Result};

/// How a procedure is invoked on the wire.
///
/// Queries are side-effect-free reads sent as `GET ?input=...`; mutations
/// are writes sent as `POST` with a JSON body. Retry behavior is identical
/// for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Query,
    Mutation,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// A single remote procedure call: name, opaque input, and kind.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub procedure: String,
    pub input: Value,
    pub kind: CallKind,
}

impl RpcRequest {
    pub fn new(procedure: impl Into<String>, input: Value, kind: CallKind) -> Self {
        Self {
            procedure: procedure.into(),
            input,
            kind,
        }
    }

    pub fn query(procedure: impl Into<String>, input: Value) -> Self {
        Self::new(procedure, input, CallKind::Query)
    }

    pub fn mutation(procedure: impl Into<String>, input: Value) -> Self {
        Self::new(procedure, input, CallKind::Mutation)
    }

    /// The `{"json": input}` wrapper tRPC expects for both query and body input
    pub fn wire_input(&self) -> Value {
        serde_json::json!({ "json": self.input })
    }
}

/// Validate a dot-separated procedure name such as `projects.listProjects`.
///
/// Segments must be non-empty and contain only ASCII alphanumerics, `_` or `-`,
/// which also keeps the name safe to splice into the upstream URL path.
pub fn validate_procedure(procedure: &str) -> Result<()> {
    if procedure.is_empty() {
        return Err(GatewayError::BadRequest("Procedure name is empty".into()));
    }

    let valid = procedure.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });

    if valid {
        Ok(())
    } else {
        Err(GatewayError::BadRequest(format!(
            "Invalid procedure name: {}",
            procedure
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_input_wraps_json() {
        let req = RpcRequest::mutation("projects.createProject", json!({ "name": "blog" }));
        assert_eq!(req.wire_input(), json!({ "json": { "name": "blog" } }));
        assert_eq!(req.kind, CallKind::Mutation);
    }

    #[test]
    fn test_validate_procedure() {
        assert!(validate_procedure("auth.login").is_ok());
        assert!(validate_procedure("services.app.deployService").is_ok());
        assert!(validate_procedure("monitor").is_ok());

        assert!(validate_procedure("").is_err());
        assert!(validate_procedure("auth.").is_err());
        assert!(validate_procedure(".auth").is_err());
        assert!(validate_procedure("auth..login").is_err());
        assert!(validate_procedure("auth/login").is_err());
        assert!(validate_procedure("auth.login?x=1").is_err());
    }
}
