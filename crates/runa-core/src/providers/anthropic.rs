//! Native Anthropic client (Messages API).

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;

use super::ChatMessage;

/// Default base URL for the Anthropic API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Configuration for the Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// The effective credential (auth token or API key).
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Anthropic API client.
#[derive(Debug)]
pub struct AnthropicClient {
    config: AnthropicConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// Creates a new Anthropic client with the given configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    /// Sends a non-streaming completion request and returns the text content.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or a
    /// response without text content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "messages": messages,
        });

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Anthropic API returned {status}: {body}");
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .context("Anthropic response contained no text content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_exposes_configured_endpoint() {
        let client = AnthropicClient::new(AnthropicConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:9999".to_string(),
            model: "claude-3-x".to_string(),
        });
        assert_eq!(client.model(), "claude-3-x");
        assert_eq!(client.base_url(), "http://127.0.0.1:9999");
        assert_eq!(client.api_key(), "sk-test");
    }
}
