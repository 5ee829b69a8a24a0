//! Structured logging configuration.

use doc_agent_core::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,doc_agent=debug";

/// Install the global subscriber: env filter plus a plain or JSON fmt layer.
pub fn configure_tracing(json: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    // Exactly one of the two fmt layers is present.
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().with_current_span(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::debug!(json, "Tracing configured");
    Ok(())
}
