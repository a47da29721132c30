//! LLM client factory functions for CLI commands.
//!
//! Provides builders for creating LLM clients from configuration.

use std::sync::Arc;

use crate::Result;
use crate::config::LlmConfig;
use crate::llm::{
    LlmHttpConfig, LlmProvider, LlmResilienceConfig, OpenAiClient, ResilientLlmProvider,
};

/// Builds an `OpenAI`-compatible client from configuration.
///
/// The client is returned even without an API key; call
/// [`OpenAiClient::validate`] or use [`build_llm_provider`] to require one.
#[must_use]
pub fn build_openai_client(llm_config: &LlmConfig) -> OpenAiClient {
    let mut client = OpenAiClient::new();
    if let Some(ref api_key) = llm_config.api_key {
        client = client.with_secret_key(api_key.clone());
    }
    if let Some(ref model) = llm_config.model {
        client = client.with_model(model);
    }
    if let Some(ref endpoint) = llm_config.endpoint {
        client = client.with_endpoint(endpoint);
    }
    client.with_http_config(LlmHttpConfig::from_config(llm_config))
}

/// Builds the shared, resilience-wrapped LLM provider.
///
/// # Errors
///
/// Returns [`crate::Error::Configuration`] if no API key is configured.
pub fn build_llm_provider(llm_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    llm_config.require_api_key()?;

    let client = build_openai_client(llm_config);
    client.validate()?;
    tracing::debug!(model = client.model(), "Built LLM provider");

    Ok(Arc::new(ResilientLlmProvider::new(
        client,
        LlmResilienceConfig::from_config(llm_config),
    )))
}
