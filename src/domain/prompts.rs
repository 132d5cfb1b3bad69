//! Built-in prompts registered by the server binary

use std::fmt::Write;

use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::command::{PromptArguments, PromptDefinition};
use crate::domain::registry::PromptRegistry;
use crate::errors::{HandlerError, RegistryError};

pub const BUILTIN_PROMPTS: &[&str] = &["echo", "greet", "timestamp"];

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub async fn echo(arguments: PromptArguments) -> Result<Value, HandlerError> {
    Ok(json!(arguments.str("text")?))
}

pub async fn greet(arguments: PromptArguments) -> Result<Value, HandlerError> {
    let name = arguments.str("name")?.trim();
    if name.is_empty() {
        return Err(HandlerError::new("name must not be empty"));
    }

    Ok(json!(format!("{}, {name}!", arguments.str("greeting")?)))
}

pub async fn timestamp(arguments: PromptArguments) -> Result<Value, HandlerError> {
    let format = arguments.str("format")?;
    let mut rendered = String::new();
    write!(rendered, "{}", Utc::now().format(format))
        .map_err(|_| HandlerError::new(format!("invalid timestamp format: {format}")))?;
    Ok(json!(rendered))
}

pub fn builtin_definition(name: &str) -> Option<PromptDefinition> {
    let definition = match name {
        "echo" => PromptDefinition::new("echo", echo)
            .description("Return the given text unchanged.")
            .argument("text"),
        "greet" => PromptDefinition::new("greet", greet)
            .description(
                "Build a greeting for someone.

                The greeting word defaults to \"Hello\".",
            )
            .argument("name")
            .optional_argument("greeting", json!("Hello")),
        "timestamp" => PromptDefinition::new("timestamp", timestamp)
            .description("Current UTC time rendered with a strftime-style format.")
            .optional_argument("format", json!(DEFAULT_TIMESTAMP_FORMAT)),
        _ => return None,
    };
    Some(definition)
}

/// Registers the named built-in prompts, in the given order.
pub fn register_builtin_prompts<S: AsRef<str>>(
    registry: &mut PromptRegistry,
    names: &[S],
) -> Result<(), RegistryError> {
    for name in names {
        let definition = builtin_definition(name.as_ref())
            .ok_or_else(|| RegistryError::not_found(name.as_ref()))?;
        registry.register(definition)?;
    }
    Ok(())
}
