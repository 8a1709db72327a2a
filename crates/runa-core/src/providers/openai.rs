//! OpenAI-compatible client (Chat Completions API).
//!
//! Also used for Anthropic models served through an OpenAI-compatible proxy,
//! with the proxy's base URL and the effective Anthropic credential.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;

use super::ChatMessage;

/// Default base URL for the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI-compatible client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// OpenAI-compatible API client.
#[derive(Debug)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Creates a new OpenAI-compatible client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Self {
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
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI API returned {status}: {body}");
        }

        let parsed: ChatCompletionsResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .context("OpenAI response contained no text content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_exposes_configured_endpoint() {
        let client = OpenAiClient::new(OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:9999/v1".to_string(),
            model: "gpt-4".to_string(),
        });
        assert_eq!(client.model(), "gpt-4");
        assert_eq!(client.base_url(), "http://127.0.0.1:9999/v1");
        assert_eq!(client.api_key(), "sk-test");
    }
}
