use std::env;

use thiserror::Error;

use crate::domain::prompts::BUILTIN_PROMPTS;
use crate::mcp::server::ServerInfo;

pub const DEFAULT_SERVER_NAME: &str = "prompt context server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub enabled_prompts: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONTEXT_SERVER_VERSION must not be empty or contain whitespace")]
    InvalidVersion,
    #[error("CONTEXT_SERVER_PROMPTS names unknown prompt '{0}'")]
    UnknownPrompt(String),
    #[error("CONTEXT_SERVER_PROMPTS must name at least one prompt")]
    EmptyPromptList,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_name = lookup("CONTEXT_SERVER_NAME")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());

        let server_version = match lookup("CONTEXT_SERVER_VERSION") {
            Some(value) => {
                let value = value.trim();
                if value.is_empty() || value.contains(char::is_whitespace) {
                    return Err(ConfigError::InvalidVersion);
                }
                value.to_string()
            }
            None => env!("CARGO_PKG_VERSION").to_string(),
        };

        let enabled_prompts = match lookup("CONTEXT_SERVER_PROMPTS") {
            Some(value) => parse_prompt_list(&value)?,
            None => BUILTIN_PROMPTS.iter().map(|name| name.to_string()).collect(),
        };

        Ok(Self {
            server_name,
            server_version,
            enabled_prompts,
        })
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
        }
    }
}

fn parse_prompt_list(value: &str) -> Result<Vec<String>, ConfigError> {
    let mut prompts: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !BUILTIN_PROMPTS.iter().any(|builtin| *builtin == name) {
            return Err(ConfigError::UnknownPrompt(name.to_string()));
        }
        if !prompts.iter().any(|existing| existing == name) {
            prompts.push(name.to_string());
        }
    }

    if prompts.is_empty() {
        return Err(ConfigError::EmptyPromptList);
    }
    Ok(prompts)
}
