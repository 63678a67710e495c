//! LLM HTTP Client
//!
//! This module provides the HTTP client shared by the providers. Requests
//! carry a timeout but are never retried: a failed call is reported for
//! that one question.

use crate::error::{AgentError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// HTTP client for LLM API requests
#[derive(Debug, Clone)]
pub struct LLMHttpClient {
    /// Reqwest HTTP client
    client: Client,
    timeout: Duration,
}

impl LLMHttpClient {
    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sql-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON body and return the response text
    ///
    /// A non-2xx status becomes an API error tagged with `provider`.
    pub async fn post_json<T: Serialize>(
        &self,
        provider: &str,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<String> {
        debug!(provider, url, "Sending completion request");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::api(
                provider,
                status.as_u16(),
                error_message(&text),
            ));
        }

        Ok(text)
    }

    /// Build standard headers for bearer-token APIs
    pub fn build_headers(api_key: &str) -> Result<HeaderMap> {
        let headers = Self::json_headers();
        Self::add_header(headers, AUTHORIZATION.as_str(), &format!("Bearer {}", api_key))
    }

    /// Headers with only the JSON content type
    pub fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Add custom header to existing headers
    pub fn add_header(mut headers: HeaderMap, key: &str, value: &str) -> Result<HeaderMap> {
        let key_header = HeaderName::from_str(key)
            .map_err(|_| AgentError::Config(format!("Invalid header name: {}", key)))?;
        // The value may be a credential, so it stays out of the message
        let mut value_header = HeaderValue::from_str(value)
            .map_err(|_| AgentError::Config(format!("Invalid value for header {}", key)))?;
        value_header.set_sensitive(key_header == AUTHORIZATION || key.contains("key"));

        headers.insert(key_header, value_header);
        Ok(headers)
    }
}

/// Pull a readable message out of an error body
///
/// Both supported APIs answer `{"error": {"message": ...}}`; anything else
/// is passed through, truncated.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|m| m.as_str());

    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_with_timeout() {
        let client = LLMHttpClient::with_timeout(30).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(30));

        let client = LLMHttpClient::with_timeout(0).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_headers_building() {
        let headers = LLMHttpClient::build_headers("test-key").unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");
        assert!(headers.get("authorization").unwrap().is_sensitive());
    }

    #[test]
    fn test_invalid_header_value() {
        let err = LLMHttpClient::build_headers("bad\nkey").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(!err.to_string().contains("bad"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#),
            "invalid x-api-key"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
    }
}
