//! Anthropic Claude API Provider
//!
//! This module implements the LLMProvider trait for Anthropic's Messages API.

use crate::error::{AgentError, Result};
use crate::llm::client::LLMHttpClient;
use crate::llm::provider::{GenerationParams, LLMProvider, LLMResponse, Message, MessageRole};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anthropic API base URL
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1/messages";

/// API version sent in the `anthropic-version` header
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic Claude API provider
pub struct AnthropicProvider {
    /// API key for authentication
    api_key: String,
    /// Model to use
    model: String,
    /// Endpoint (overridable for proxies and tests)
    base_url: String,
    /// HTTP client for making requests
    client: LLMHttpClient,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>, model: Option<String>, client: LLMHttpClient) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: ANTHROPIC_API_BASE.to_string(),
            client,
        }
    }

    /// Send requests to a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build headers for Anthropic API
    fn build_headers(&self) -> Result<HeaderMap> {
        let headers = LLMHttpClient::json_headers();
        let headers = LLMHttpClient::add_header(headers, "x-api-key", &self.api_key)?;
        LLMHttpClient::add_header(headers, "anthropic-version", ANTHROPIC_VERSION)
    }

    /// Build the request body
    ///
    /// System messages go into the top-level `system` field; the API only
    /// accepts user and assistant turns in `messages`.
    fn build_request(&self, messages: &[Message], params: &GenerationParams) -> AnthropicRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: params.max_tokens,
            temperature: Some(params.temperature),
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
        }
    }
}

/// Map a Messages API response body to an [`LLMResponse`]
pub fn parse_response(body: &str) -> Result<LLMResponse> {
    let response: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::api("Anthropic", 200, format!("Failed to parse response: {}", e)))?;

    // Concatenate all text blocks
    let content: String = response
        .content
        .iter()
        .filter(|block| block.type_ == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    Ok(LLMResponse {
        content,
        input_tokens: response.usage.as_ref().map(|u| u.input_tokens),
        output_tokens: response.usage.as_ref().map(|u| u.output_tokens),
        model: Some(response.model),
        finish_reason: response.stop_reason,
    })
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, params);
        let headers = self.build_headers()?;

        let body = self
            .client
            .post_json(self.provider_name(), &self.base_url, headers, &request)
            .await?;

        let response = parse_response(&body)?;
        debug!(
            model = ?response.model,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "Anthropic completion received"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

/// Anthropic API message format
#[derive(Debug, Serialize, Clone)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

/// Content block in Anthropic response
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    type_: String,
    text: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}
