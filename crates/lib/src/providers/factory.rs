//! # AI Provider Factory
//!
//! This module centralizes the logic for turning a provider configuration into
//! a live AI provider client, so the server and tests build providers the same way.

use crate::{
    errors::PromptError,
    providers::ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// A reusable configuration for a specific AI provider instance.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("gemini" or "local").
    pub provider: String,
    /// The API URL. Optional for Gemini, where it is derived from the model name.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The API key, which can be null for local providers.
    #[serde(default)]
    pub api_key: Option<String>,
    pub model_name: String,
}

/// Creates an AI provider instance from its configuration.
///
/// `name` is the key of the provider in the configuration and only appears in
/// error messages and logs.
pub fn create_provider(
    name: &str,
    config: &ProviderConfig,
    timeout: Option<Duration>,
) -> Result<Box<dyn AiProvider>, PromptError> {
    let provider: Box<dyn AiProvider> = match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    PromptError::MissingAiProvider(format!(
                        "api_key is required for gemini provider '{name}'. Please set AI_API_KEY in your .env file."
                    ))
                })?;
            let api_url = config
                .api_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| GeminiProvider::default_api_url(&config.model_name));
            info!(provider = %name, api_url = %api_url, "Configuring Gemini provider.");
            Box::new(GeminiProvider::new(api_url, api_key, timeout)?)
        }
        "local" => {
            let api_url = config
                .api_url
                .clone()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| {
                    PromptError::MissingAiProvider(format!(
                        "api_url is required for local provider '{name}'. Please set LOCAL_AI_API_URL in your .env file."
                    ))
                })?;
            info!(provider = %name, api_url = %api_url, "Configuring local AI provider.");
            Box::new(LocalAiProvider::new(
                api_url,
                config.api_key.clone(),
                Some(config.model_name.clone()),
                timeout,
            )?)
        }
        other => {
            return Err(PromptError::MissingAiProvider(format!(
                "Unsupported AI provider type '{other}' for provider '{name}'"
            )))
        }
    };

    Ok(provider)
}
