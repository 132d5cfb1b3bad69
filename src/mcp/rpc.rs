//! JSON-RPC envelope representations and error mapping
//!
//! Every reply written by the server is a [`ResponseEnvelope`] carrying either
//! a `result` or an `error`, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::RegistryError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal() -> Self {
        Self::new(INTERNAL_ERROR, "Internal error")
    }
}

impl From<RegistryError> for RpcError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } | RegistryError::Invocation { .. } => {
                Self::invalid_params(err.to_string())
            }
            RegistryError::InvalidHandler { .. } => Self::internal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ResponseEnvelope {
    pub fn new(id: Value, outcome: Result<Value, RpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: match outcome {
                Ok(result) => Outcome::Result(result),
                Err(error) => Outcome::Error(error),
            },
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self::new(id, Err(error))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Renders the envelope as a single line of JSON without the terminator.
    pub fn to_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response envelope");
                fallback_internal_error_line()
            }
        }
    }
}

fn fallback_internal_error_line() -> String {
    format!(
        r#"{{"jsonrpc":"{JSONRPC_VERSION}","id":null,"error":{{"code":{INTERNAL_ERROR},"message":"Internal error"}}}}"#
    )
}
