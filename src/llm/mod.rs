//! LLM integration module
//!
//! This module provides trait-based LLM provider abstraction
//! and the Anthropic and OpenAI implementations.

pub mod client;
pub mod provider;

// Provider implementations
pub mod providers {
    pub mod anthropic;
    pub mod openai;
}

use crate::config::{ProviderKind, Settings};
use crate::error::Result;
use client::LLMHttpClient;
use providers::anthropic::AnthropicProvider;
use providers::openai::OpenAIProvider;

// Re-exports
pub use provider::{GenerationParams, LLMProvider, LLMResponse, Message, MessageRole};

/// Build the provider selected in the settings
///
/// Fails when the selected provider has no API key.
pub fn build_provider(settings: &Settings) -> Result<Box<dyn LLMProvider>> {
    let api_key = settings.require_api_key()?.to_string();
    let client = LLMHttpClient::with_timeout(settings.timeout_secs)?;
    let model = Some(settings.model.clone());

    let provider: Box<dyn LLMProvider> = match settings.provider {
        ProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(api_key, model, client);
            if let Some(ref url) = settings.api_base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
        ProviderKind::OpenAI => {
            let mut provider = OpenAIProvider::new(api_key, model, client);
            if let Some(ref url) = settings.api_base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
    };

    provider.validate_config()?;
    Ok(provider)
}

/// Generation parameters from the settings
pub fn generation_params(settings: &Settings) -> GenerationParams {
    GenerationParams::new()
        .with_max_tokens(settings.max_tokens)
        .with_temperature(settings.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::storage::FileConfig;

    #[test]
    fn test_build_provider_requires_key() {
        let settings = Settings::from_sources(FileConfig::default(), |_| None).unwrap();
        assert!(build_provider(&settings).is_err());
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let mut settings = Settings::from_sources(FileConfig::default(), |_| None).unwrap();
        settings.api_key = Some("   ".to_string());

        let err = build_provider(&settings).err().unwrap();
        assert!(err.to_string().contains("no API key configured for Anthropic"));
    }

    #[test]
    fn test_build_selected_provider() {
        let settings = Settings::from_sources(FileConfig::default(), |key| match key {
            "SQL_AGENT_PROVIDER" => Some("openai".to_string()),
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();

        let provider = build_provider(&settings).unwrap();
        assert_eq!(provider.provider_name(), "OpenAI");
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(generation_params(&settings).max_tokens, 1024);
    }
}
