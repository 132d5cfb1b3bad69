use std::io;

use thiserror::Error;

/// Fault raised by a prompt handler while producing its result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid handler: {reason}")]
    InvalidHandler { reason: String },
    #[error("Unknown prompt: {name}")]
    NotFound { name: String },
    #[error("{message}")]
    Invocation { name: String, message: String },
}

impl RegistryError {
    pub fn invalid_handler(reason: impl Into<String>) -> Self {
        Self::InvalidHandler {
            reason: reason.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invocation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Unrecoverable failures that stop the serving loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read request line: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write response line: {0}")]
    Write(#[source] io::Error),
}
