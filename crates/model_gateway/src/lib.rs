//! Model gateway for the document agent.
//!
//! This crate provides the Rig-backed `LlmClient` used for completions and
//! embeddings.

pub mod rig_client;

pub use rig_client::{RigConfig, RigLlmClient, RigProvider};

use doc_agent_core::config::ModelGatewayConfig;

/// Create an LLM client from configuration.
///
/// Fails when the configured provider is unknown or its API key variable is unset.
pub fn create_client_from_config(config: &ModelGatewayConfig) -> doc_agent_core::Result<RigLlmClient> {
    let provider: RigProvider = config.provider.parse()?;
    if std::env::var(provider.api_key_var()).is_err() {
        return Err(doc_agent_core::Error::config(format!(
            "{} must be set for provider '{}'",
            provider.api_key_var(),
            config.provider
        )));
    }

    let rig_cfg = match provider {
        RigProvider::OpenAI => RigConfig::openai(&config.model),
        RigProvider::Anthropic => RigConfig::anthropic(&config.model),
    };
    tracing::info!(provider = ?provider, model = %config.model, "LLM client configured");
    Ok(RigLlmClient::new(rig_cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ModelGatewayConfig {
            provider: "nope".to_string(),
            model: "x".to_string(),
        };
        assert!(create_client_from_config(&config).is_err());
    }
}
