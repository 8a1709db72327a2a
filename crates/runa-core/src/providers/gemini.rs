//! Google Gemini client (generateContent API).

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;

use super::ChatMessage;

/// Default base URL for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Optional base URL override; the client applies the default itself.
    pub base_url: Option<String>,
    pub model: String,
}

/// Gemini API client.
#[derive(Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Creates a new Gemini client with the given configuration.
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    /// Returns the effective base URL (override or default).
    pub fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Sends a non-streaming completion request and returns the text content.
    ///
    /// Gemini has no system/assistant role pair matching other providers;
    /// assistant turns are mapped to the "model" role.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or a
    /// response without text content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(),
            self.config.model
        );

        let contents: Vec<_> = messages
            .iter()
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({ "contents": contents }))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;
        parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|part| part.text)
            .context("Gemini response contained no text content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_defaults_when_no_override() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "sk-goog".to_string(),
            base_url: None,
            model: "gemini-pro".to_string(),
        });
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_override_applied_internally() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "sk-goog".to_string(),
            base_url: Some("http://127.0.0.1:9999".to_string()),
            model: "gemini-pro".to_string(),
        });
        assert_eq!(client.base_url(), "http://127.0.0.1:9999");
        assert_eq!(client.model(), "gemini-pro");
    }
}
