//! LLM Provider Trait
//!
//! This module defines the trait-based abstraction over completion APIs.
//! The agent only talks to [`LLMProvider`], so tests can script the model.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// LLM message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (sets behavior/context)
    System,
    /// User message (query or input)
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// LLM message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: MessageRole,
    /// Message content
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    /// Number of tokens used (input)
    pub input_tokens: Option<u32>,
    /// Number of tokens used (output)
    pub output_tokens: Option<u32>,
    /// Model used for generation
    pub model: Option<String>,
    /// Finish reason as reported by the API (e.g. "end_turn", "length")
    pub finish_reason: Option<String>,
}

impl LLMResponse {
    /// Create a new response
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Whether generation stopped at the token limit
    pub fn hit_token_limit(&self) -> bool {
        matches!(
            self.finish_reason.as_deref(),
            Some("max_tokens") | Some("length")
        )
    }
}

/// LLM generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature (0.0 - 2.0, higher = more random)
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

impl GenerationParams {
    /// Create new default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the conversation
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<LLMResponse>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Model requested by this provider
    fn model(&self) -> &str;

    /// Check if the provider has an API key configured
    fn has_api_key(&self) -> bool;

    /// Validate the provider configuration
    fn validate_config(&self) -> Result<()> {
        if !self.has_api_key() {
            return Err(AgentError::Config(format!(
                "no API key configured for {}",
                self.provider_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        assert_eq!(Message::system("rules").role, MessageRole::System);
        assert_eq!(Message::user("Hello").role, MessageRole::User);
        assert_eq!(Message::user("Hello").role.as_str(), "user");
    }

    #[test]
    fn test_generation_params_builder() {
        let params = GenerationParams::new()
            .with_max_tokens(2048)
            .with_temperature(0.5);

        assert_eq!(params.max_tokens, 2048);
        assert_eq!(params.temperature, 0.5);
        assert_eq!(GenerationParams::default().max_tokens, 1024);
    }

    #[test]
    fn test_llm_response() {
        let response = LLMResponse {
            content: "Test".to_string(),
            input_tokens: Some(10),
            output_tokens: Some(5),
            finish_reason: Some("max_tokens".to_string()),
            ..LLMResponse::default()
        };

        assert!(response.hit_token_limit());
        assert!(!LLMResponse::new("done").hit_token_limit());
    }
}
