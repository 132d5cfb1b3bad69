//! Prompt command registry
//!
//! Stores commands by name in registration order. Registration happens before
//! serving; the registry is then shared read-only behind an `Arc`.

use std::{any::Any, collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::command::{
    PromptArguments, PromptCommand, PromptDefinition, PromptDescriptor, PromptHandler,
};
use crate::errors::RegistryError;

#[derive(Debug, Default)]
pub struct PromptRegistry {
    commands: Vec<PromptCommand>,
    index: HashMap<String, usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handler and hands it back. A later registration under the
    /// same name replaces the earlier one in place.
    pub fn register(
        &mut self,
        definition: PromptDefinition,
    ) -> Result<Arc<dyn PromptHandler>, RegistryError> {
        let command = definition.build()?;
        let handler = command.handler();
        let name = command.name().to_string();

        match self.index.get(&name) {
            Some(&position) => {
                warn!(prompt = %name, "replacing previously registered prompt");
                self.commands[position] = command;
            }
            None => {
                debug!(prompt = %name, "registered prompt");
                self.index.insert(name, self.commands.len());
                self.commands.push(command);
            }
        }

        Ok(handler)
    }

    pub fn list(&self) -> Vec<PromptDescriptor> {
        self.commands
            .iter()
            .map(|command| command.descriptor().clone())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(PromptCommand::name)
    }

    pub fn get(&self, name: &str) -> Result<&PromptCommand, RegistryError> {
        self.index
            .get(name)
            .and_then(|&position| self.commands.get(position))
            .ok_or_else(|| RegistryError::not_found(name))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Invokes a command on its own task so a panicking handler only fails
    /// this call.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<Value, RegistryError> {
        let command = self.get(name)?;
        let bound = command.bind_arguments(arguments)?;
        let handler = command.handler();

        let task = tokio::spawn(async move { handler.call(bound).await });
        match task.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(RegistryError::invocation(name, err.message())),
            Err(join_err) if join_err.is_panic() => Err(RegistryError::invocation(
                name,
                panic_message(join_err.into_panic()),
            )),
            Err(join_err) => Err(RegistryError::invocation(name, join_err.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "prompt handler panicked".to_string()
    }
}
