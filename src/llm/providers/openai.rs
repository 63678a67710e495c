//! OpenAI API Provider
//!
//! This module implements the LLMProvider trait for OpenAI's Chat
//! Completions API.

use crate::error::{AgentError, Result};
use crate::llm::client::LLMHttpClient;
use crate::llm::provider::{GenerationParams, LLMProvider, LLMResponse, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI API base URL
const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI GPT API provider
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// Model to use (e.g., "gpt-4o", "gpt-4o-mini")
    model: String,
    base_url: String,
    /// HTTP client for making requests
    client: LLMHttpClient,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>, model: Option<String>, client: LLMHttpClient) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: OPENAI_API_BASE.to_string(),
            client,
        }
    }

    /// Send requests to a different endpoint (Azure, local gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, messages: &[Message], params: &GenerationParams) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|msg| OpenAIMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

/// Map a Chat Completions response body to an [`LLMResponse`]
pub fn parse_response(body: &str) -> Result<LLMResponse> {
    let response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::api("OpenAI", 200, format!("Failed to parse response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::api("OpenAI", 200, "Response contained no choices"))?;

    Ok(LLMResponse {
        content: choice.message.content.unwrap_or_default(),
        input_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
        output_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        model: Some(response.model),
        finish_reason: choice.finish_reason,
    })
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, params);
        let headers = LLMHttpClient::build_headers(&self.api_key)?;

        let body = self
            .client
            .post_json(self.provider_name(), &self.base_url, headers, &request)
            .await?;

        let response = parse_response(&body)?;
        debug!(
            model = ?response.model,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "OpenAI completion received"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// OpenAI API message format
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAIMessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new("sk-test", None, LLMHttpClient::with_timeout(60).unwrap())
    }

    #[test]
    fn test_request_keeps_system_role() {
        let messages = vec![Message::system("rules"), Message::user("question")];
        let params = GenerationParams::default().with_max_tokens(256);
        let json = serde_json::to_value(provider().build_request(&messages, &params)).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "question");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "```sql\nSELECT 1\n```"},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.content, "```sql\nSELECT 1\n```");
        assert_eq!(response.model.as_deref(), Some("gpt-4o-2024-08-06"));
        assert_eq!(response.input_tokens, Some(100));
        assert_eq!(response.output_tokens, Some(20));
        assert!(response.hit_token_limit());
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = parse_response(r#"{"model": "gpt-4o", "choices": []}"#).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
