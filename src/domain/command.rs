//! Prompt command descriptors and the handler invocation contract
//!
//! A handler declares its parameters explicitly through [`PromptDefinition`];
//! the registry turns that declaration into a [`PromptCommand`].

use std::{collections::HashSet, future::Future, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{HandlerError, RegistryError};

/// Named arguments passed to a prompt handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptArguments(Map<String, Value>);

impl PromptArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the argument as a string, failing when it is absent or not a string.
    pub fn str(&self, name: &str) -> Result<&str, HandlerError> {
        match self.0.get(name) {
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(HandlerError::new(format!(
                "argument '{name}' must be a string"
            ))),
            None => Err(HandlerError::new(format!("argument '{name}' is missing"))),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn call(&self, arguments: PromptArguments) -> Result<Value, HandlerError>;
}

#[async_trait]
impl<F, Fut> PromptHandler for F
where
    F: Fn(PromptArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn call(&self, arguments: PromptArguments) -> Result<Value, HandlerError> {
        (self)(arguments).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(skip)]
    default: Option<Value>,
}

impl ArgumentSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
            default: Some(default),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Public, serializable view of a registered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

/// Declaration of a handler before it is registered.
pub struct PromptDefinition {
    name: String,
    description: Option<String>,
    arguments: Vec<ArgumentSpec>,
    handler: Arc<dyn PromptHandler>,
}

impl PromptDefinition {
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: PromptHandler + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, doc: impl Into<String>) -> Self {
        self.description = Some(doc.into());
        self
    }

    pub fn argument(self, name: impl Into<String>) -> Self {
        self.with_argument(ArgumentSpec::required(name))
    }

    pub fn optional_argument(self, name: impl Into<String>, default: Value) -> Self {
        self.with_argument(ArgumentSpec::optional(name, default))
    }

    pub fn with_argument(mut self, spec: ArgumentSpec) -> Self {
        self.arguments.push(spec);
        self
    }

    /// Validates the declaration and freezes it into a command.
    pub fn build(self) -> Result<PromptCommand, RegistryError> {
        if !is_valid_identifier(&self.name) {
            return Err(RegistryError::invalid_handler(format!(
                "'{}' is not a valid prompt name",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for argument in &self.arguments {
            if !is_valid_identifier(&argument.name) {
                return Err(RegistryError::invalid_handler(format!(
                    "prompt '{}' declares invalid argument name '{}'",
                    self.name, argument.name
                )));
            }
            if !seen.insert(argument.name.as_str()) {
                return Err(RegistryError::invalid_handler(format!(
                    "prompt '{}' declares argument '{}' more than once",
                    self.name, argument.name
                )));
            }
        }

        Ok(PromptCommand {
            descriptor: PromptDescriptor {
                name: self.name,
                description: self.description.as_deref().map(clean_doc).unwrap_or_default(),
                arguments: self.arguments,
            },
            handler: self.handler,
        })
    }
}

pub struct PromptCommand {
    descriptor: PromptDescriptor,
    handler: Arc<dyn PromptHandler>,
}

impl std::fmt::Debug for PromptCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptCommand")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl PromptCommand {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &PromptDescriptor {
        &self.descriptor
    }

    pub fn handler(&self) -> Arc<dyn PromptHandler> {
        Arc::clone(&self.handler)
    }

    /// Binds supplied arguments against the declared parameters, filling defaults.
    pub fn bind_arguments(&self, supplied: PromptArguments) -> Result<PromptArguments, RegistryError> {
        let mut supplied = supplied.into_map();

        if let Some(unexpected) = supplied
            .keys()
            .find(|key| !self.descriptor.arguments.iter().any(|arg| &arg.name == *key))
        {
            return Err(RegistryError::invocation(
                self.name(),
                format!("{}() got an unexpected argument '{unexpected}'", self.name()),
            ));
        }

        let missing: Vec<&str> = self
            .descriptor
            .arguments
            .iter()
            .filter(|arg| arg.required && !supplied.contains_key(&arg.name))
            .map(|arg| arg.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::invocation(
                self.name(),
                format!(
                    "{}() missing required argument(s): {}",
                    self.name(),
                    missing
                        .iter()
                        .map(|name| format!("'{name}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }

        let mut bound = Map::new();
        for argument in &self.descriptor.arguments {
            if let Some(value) = supplied.remove(&argument.name) {
                bound.insert(argument.name.clone(), value);
            } else if let Some(default) = argument.default_value() {
                bound.insert(argument.name.clone(), default.clone());
            }
        }

        Ok(PromptArguments(bound))
    }
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"')
}

/// Normalizes documentation text: strips common indentation and blank edges.
pub fn clean_doc(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.trim().to_string()];
    cleaned.extend(rest.iter().map(|line| {
        line.get(indent..)
            .unwrap_or_else(|| line.trim_start())
            .trim_end()
            .to_string()
    }));

    while cleaned.first().is_some_and(|line| line.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}
