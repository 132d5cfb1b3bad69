use prompt_context_server::{
    config::Config,
    domain::{prompts::register_builtin_prompts, registry::PromptRegistry},
    logging,
    transport::stdio::serve_stdio,
    AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let mut registry = PromptRegistry::new();
    register_builtin_prompts(&mut registry, config.enabled_prompts.as_slice())?;

    info!(
        server_name = %config.server_name,
        server_version = %config.server_version,
        prompts = ?config.enabled_prompts,
        "server starting"
    );

    let state = AppState::new(config.server_info(), registry);
    serve_stdio(state).await?;
    Ok(())
}
