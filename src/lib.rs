use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod mcp;
pub mod transport;

use domain::registry::PromptRegistry;
use mcp::server::ServerInfo;

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub server_info: Arc<ServerInfo>,
    pub registry: Arc<PromptRegistry>,
}

impl AppState {
    /// Freezes the registry; no prompts can be registered once serving starts.
    pub fn new(server_info: ServerInfo, registry: PromptRegistry) -> Self {
        Self {
            server_info: Arc::new(server_info),
            registry: Arc::new(registry),
        }
    }
}
