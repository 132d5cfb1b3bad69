use std::time::Instant;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Output goes to stderr; stdout carries the protocol.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub fn log_request_summary(method: &str, id: &serde_json::Value, failed: bool, started_at: Instant) {
    info!(
        method = %method,
        id = %id,
        outcome = if failed { "failure" } else { "success" },
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );
}
