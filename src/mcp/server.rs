//! The prompt protocol dispatcher
//!
//! Decodes one request object into a typed [`Request`], routes it to the
//! registry and returns the `result` payload or an [`RpcError`]. Dispatch keeps
//! no state between requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::domain::command::{PromptArguments, PromptDescriptor};
use crate::errors::RegistryError;
use crate::mcp::rpc::{ResponseEnvelope, RpcError};
use crate::AppState;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerCapabilities {
    pub prompts: BTreeMap<String, PromptDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: u32,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<PromptDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetPromptResult {
    pub prompt: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetPromptParams {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Initialize,
    ListPrompts,
    GetPrompt(GetPromptParams),
    Unknown {
        method: String,
        params: Map<String, Value>,
    },
}

impl Request {
    pub fn method(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::ListPrompts => "prompts/list",
            Self::GetPrompt(_) => "prompts/get",
            Self::Unknown { method, .. } => method.as_str(),
        }
    }

    /// Builds a typed request from a method name and its raw params.
    pub fn parse(method: &str, params: Value) -> Result<Self, RpcError> {
        let params = match params {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                warn!(method = %method, params = %other, "request params are not an object");
                return Err(RpcError::internal());
            }
        };

        match method {
            "initialize" => Ok(Self::Initialize),
            "prompts/list" => Ok(Self::ListPrompts),
            "prompts/get" => serde_json::from_value(Value::Object(params))
                .map(Self::GetPrompt)
                .map_err(|err| {
                    warn!(error = %err, "malformed prompts/get params");
                    RpcError::internal()
                }),
            _ => Ok(Self::Unknown {
                method: method.to_string(),
                params,
            }),
        }
    }
}

/// Decodes and dispatches one request object, always producing an envelope.
pub async fn handle_json_rpc_value(state: &AppState, payload: Value) -> ResponseEnvelope {
    let Value::Object(mut object) = payload else {
        warn!("request is not a JSON object");
        return ResponseEnvelope::error(Value::Null, RpcError::internal());
    };

    let id = object.remove("id").unwrap_or(Value::Null);
    let params = object.remove("params").unwrap_or(Value::Null);
    let audit_params = redact_audit_value(&params);

    let (method, outcome) = match object.remove("method") {
        Some(Value::String(method)) => {
            let outcome = match Request::parse(&method, params) {
                Ok(request) => handle_json_rpc_request(state, request).await,
                Err(err) => Err(err),
            };
            (method, outcome)
        }
        other => {
            let method = render_value(other.as_ref());
            error!(method = %method, "method name is not a string");
            let outcome = Err(RpcError::method_not_found(&method));
            (method, outcome)
        }
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if outcome.is_err() { "failure" } else { "success" },
        "prompt action audited"
    );

    ResponseEnvelope::new(id, outcome)
}

pub async fn handle_json_rpc_request(state: &AppState, request: Request) -> Result<Value, RpcError> {
    debug!(method = %request.method(), "dispatching request");

    match request {
        Request::Initialize => to_result_value(&initialize_result(state)),
        Request::ListPrompts => to_result_value(&ListPromptsResult {
            prompts: state.registry.list(),
        }),
        Request::GetPrompt(params) => get_prompt(state, params).await,
        Request::Unknown { method, .. } => {
            error!(method = %method, "unknown method");
            Err(RpcError::method_not_found(&method))
        }
    }
}

pub fn initialize_result(state: &AppState) -> InitializeResult {
    let prompts = state
        .registry
        .list()
        .into_iter()
        .map(|descriptor| (descriptor.name.clone(), descriptor))
        .collect();

    InitializeResult {
        protocol_version: PROTOCOL_VERSION,
        capabilities: ServerCapabilities { prompts },
        server_info: state.server_info.as_ref().clone(),
    }
}

async fn get_prompt(state: &AppState, params: GetPromptParams) -> Result<Value, RpcError> {
    let name = match params.name {
        Some(Value::String(name)) => name,
        other => {
            let rendered = render_value(other.as_ref());
            warn!(prompt = %rendered, "prompt name is not a string");
            return Err(RpcError::from(RegistryError::not_found(rendered)));
        }
    };
    let arguments = PromptArguments::new(params.arguments.unwrap_or_default());

    match state.registry.invoke(&name, arguments).await {
        Ok(prompt) => to_result_value(&GetPromptResult { prompt }),
        Err(err) => {
            warn!(prompt = %name, error = %err, "prompt invocation failed");
            Err(RpcError::from(err))
        }
    }
}

/// Renders a request field for an error message; an absent field reads `null`.
fn render_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".to_string(), Value::to_string)
}

fn to_result_value<T: Serialize>(result: &T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|err| {
        error!(error = %err, "failed to serialize result");
        RpcError::internal()
    })
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
