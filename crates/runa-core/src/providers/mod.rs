//! Model provider resolution and LLM client construction.
//!
//! Classification of a model identifier into a provider family is a pure
//! function over a closed enum; identifiers outside every known family pass
//! through unresolved for the downstream agent framework to interpret.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::{Deserialize, Serialize};

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use gemini::{GeminiClient, GeminiConfig};
pub use openai::{OpenAiClient, OpenAiConfig};

use crate::config::Config;
use crate::error::{RuntimeError, RuntimeResult};

/// Known provider families, grouped by API shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Anthropic,
    OpenAi,
    Google,
}

impl ModelFamily {
    /// Returns the string identifier used in config sections.
    pub fn id(&self) -> &'static str {
        match self {
            ModelFamily::Anthropic => "anthropic",
            ModelFamily::OpenAi => "openai",
            ModelFamily::Google => "google",
        }
    }

    /// Classifies a model identifier by prefix.
    ///
    /// Priority order: `claude` is Anthropic, `gpt`/`o1`/`o3`/`o4` is OpenAI,
    /// `gemini` is Google. Anything else returns `None` and is handed through
    /// unresolved.
    pub fn classify(model: &str) -> Option<ModelFamily> {
        let model = model.trim();
        if model.starts_with("claude") {
            Some(ModelFamily::Anthropic)
        } else if model.starts_with("gpt")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
        {
            Some(ModelFamily::OpenAi)
        } else if model.starts_with("gemini") {
            Some(ModelFamily::Google)
        } else {
            None
        }
    }
}

/// A chat message sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A resolved, ready-to-use model handle.
///
/// Carries its own provider identity and target endpoint. `Passthrough`
/// hands the raw identifier to the agent framework unresolved.
#[derive(Debug)]
pub enum ModelHandle {
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    Passthrough(String),
}

impl ModelHandle {
    /// Returns the model identifier this handle targets.
    pub fn model(&self) -> &str {
        match self {
            ModelHandle::Anthropic(client) => client.model(),
            ModelHandle::OpenAi(client) => client.model(),
            ModelHandle::Gemini(client) => client.model(),
            ModelHandle::Passthrough(model) => model,
        }
    }

    /// Returns a short label for diagnostics (never includes credentials).
    pub fn describe(&self) -> String {
        match self {
            ModelHandle::Anthropic(client) => format!("anthropic:{}", client.model()),
            ModelHandle::OpenAi(client) => format!("openai:{}", client.model()),
            ModelHandle::Gemini(client) => format!("google:{}", client.model()),
            ModelHandle::Passthrough(model) => format!("passthrough:{model}"),
        }
    }
}

/// Validates that a configured base URL override is well-formed.
fn validate_base_url(url: &str, provider: &str) -> RuntimeResult<()> {
    url::Url::parse(url).map_err(|e| {
        RuntimeError::configuration(format!("Invalid {provider} base URL {url}: {e}"))
    })?;
    Ok(())
}

/// Resolves a model identifier into a provider client.
///
/// Falls back to the configured default model when `model_id` is absent.
/// When a proxy base URL is configured for Anthropic, the proxy speaks the
/// OpenAI-compatible API, so an OpenAI-family client is constructed and
/// pointed at it; the effective credential is provisioned explicitly through
/// the client constructor.
///
/// # Errors
/// Returns a configuration error when the resolved family has no usable
/// credential.
pub fn resolve_model(config: &Config, model_id: Option<&str>) -> RuntimeResult<ModelHandle> {
    let model = match model_id.map(str::trim).filter(|m| !m.is_empty()) {
        Some(model) => model,
        None => config.default_model(),
    };
    tracing::info!(model, "resolving model");

    let Some(family) = ModelFamily::classify(model) else {
        // Unknown family is not an error: hand the raw identifier through.
        tracing::debug!(model, "no known provider family, passing through");
        return Ok(ModelHandle::Passthrough(model.to_string()));
    };

    match family {
        ModelFamily::Anthropic => resolve_anthropic(config, model),
        ModelFamily::OpenAi => resolve_openai(config, model),
        ModelFamily::Google => resolve_google(config, model),
    }
}

fn resolve_anthropic(config: &Config, model: &str) -> RuntimeResult<ModelHandle> {
    let creds = config.credentials(ModelFamily::Anthropic);

    // A configured base URL means an OpenAI-compatible proxy sits in front of
    // the Anthropic models.
    if let Some(proxy_url) = creds.effective_base_url() {
        validate_base_url(proxy_url, "anthropic proxy")?;
        tracing::info!(
            has_api_key = creds.effective_api_key().is_some(),
            has_auth_token = creds.effective_auth_token().is_some(),
            base_url = proxy_url,
            "using proxy for anthropic"
        );

        let credential = creds.effective_credential().ok_or_else(|| {
            RuntimeError::configuration("API key not configured for anthropic proxy")
        })?;

        let client = OpenAiClient::new(OpenAiConfig {
            api_key: credential.to_string(),
            base_url: proxy_url.to_string(),
            model: model.to_string(),
        });
        return Ok(ModelHandle::OpenAi(client));
    }

    tracing::info!(
        has_api_key = creds.effective_api_key().is_some(),
        has_auth_token = creds.effective_auth_token().is_some(),
        "using anthropic api"
    );

    let credential = creds
        .effective_credential()
        .ok_or_else(|| RuntimeError::configuration("Anthropic API key not configured"))?;

    let client = AnthropicClient::new(AnthropicConfig {
        api_key: credential.to_string(),
        base_url: anthropic::DEFAULT_BASE_URL.to_string(),
        model: model.to_string(),
    });
    Ok(ModelHandle::Anthropic(client))
}

fn resolve_openai(config: &Config, model: &str) -> RuntimeResult<ModelHandle> {
    let creds = config.credentials(ModelFamily::OpenAi);
    let base_url = creds.effective_base_url();
    if let Some(url) = base_url {
        validate_base_url(url, "OpenAI")?;
    }

    tracing::info!(
        has_api_key = creds.effective_api_key().is_some(),
        base_url = base_url.unwrap_or("default"),
        "using openai api"
    );

    let api_key = creds
        .effective_api_key()
        .ok_or_else(|| RuntimeError::configuration("OpenAI API key not configured"))?;

    let client = OpenAiClient::new(OpenAiConfig {
        api_key: api_key.to_string(),
        base_url: base_url.unwrap_or(openai::DEFAULT_BASE_URL).to_string(),
        model: model.to_string(),
    });
    Ok(ModelHandle::OpenAi(client))
}

fn resolve_google(config: &Config, model: &str) -> RuntimeResult<ModelHandle> {
    let creds = config.credentials(ModelFamily::Google);

    tracing::info!(
        has_api_key = creds.effective_api_key().is_some(),
        base_url = creds.effective_base_url().unwrap_or("default"),
        "using google api"
    );

    let api_key = creds
        .effective_api_key()
        .ok_or_else(|| RuntimeError::configuration("Google API key not configured"))?;

    // The Gemini client applies any base URL override itself.
    let client = GeminiClient::new(GeminiConfig {
        api_key: api_key.to_string(),
        base_url: creds.effective_base_url().map(ToString::to_string),
        model: model.to_string(),
    });
    Ok(ModelHandle::Gemini(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialsConfig;

    fn config_with(
        section: ModelFamily,
        api_key: Option<&str>,
        auth_token: Option<&str>,
        base_url: Option<&str>,
    ) -> Config {
        let mut config = Config::default();
        let creds = CredentialsConfig {
            api_key: api_key.map(ToString::to_string),
            auth_token: auth_token.map(ToString::to_string),
            base_url: base_url.map(ToString::to_string),
        };
        match section {
            ModelFamily::Anthropic => config.providers.anthropic = creds,
            ModelFamily::OpenAi => config.providers.openai = creds,
            ModelFamily::Google => config.providers.google = creds,
        }
        config
    }

    #[test]
    fn test_classify_known_families() {
        assert_eq!(
            ModelFamily::classify("claude-3-x"),
            Some(ModelFamily::Anthropic)
        );
        assert_eq!(ModelFamily::classify("gpt-4"), Some(ModelFamily::OpenAi));
        assert_eq!(ModelFamily::classify("o1-mini"), Some(ModelFamily::OpenAi));
        assert_eq!(ModelFamily::classify("o3"), Some(ModelFamily::OpenAi));
        assert_eq!(ModelFamily::classify("o4-mini"), Some(ModelFamily::OpenAi));
        assert_eq!(
            ModelFamily::classify("gemini-pro"),
            Some(ModelFamily::Google)
        );
        assert_eq!(ModelFamily::classify("llama-3-70b"), None);
    }

    #[test]
    fn test_anthropic_native_with_api_key() {
        let config = config_with(ModelFamily::Anthropic, Some("sk-ant"), None, None);
        let handle = resolve_model(&config, Some("claude-3-x")).unwrap();
        match handle {
            ModelHandle::Anthropic(client) => {
                assert_eq!(client.model(), "claude-3-x");
                assert_eq!(client.api_key(), "sk-ant");
                assert_eq!(client.base_url(), anthropic::DEFAULT_BASE_URL);
            }
            other => panic!("expected anthropic handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_anthropic_auth_token_precedence() {
        let config = config_with(ModelFamily::Anthropic, Some("sk-ant"), Some("tok-ant"), None);
        let handle = resolve_model(&config, Some("claude-3-x")).unwrap();
        match handle {
            ModelHandle::Anthropic(client) => assert_eq!(client.api_key(), "tok-ant"),
            other => panic!("expected anthropic handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_anthropic_no_credentials_fails() {
        let config = config_with(ModelFamily::Anthropic, None, None, None);
        let err = resolve_model(&config, Some("claude-3-x")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("Anthropic"));
    }

    #[test]
    fn test_anthropic_proxy_builds_openai_compatible_client() {
        let config = config_with(
            ModelFamily::Anthropic,
            Some("sk-ant"),
            Some("tok-ant"),
            Some("https://proxy.example.com"),
        );
        let handle = resolve_model(&config, Some("claude-3-x")).unwrap();
        match handle {
            ModelHandle::OpenAi(client) => {
                assert_eq!(client.model(), "claude-3-x");
                assert_eq!(client.base_url(), "https://proxy.example.com");
                // Auth token wins over API key for the proxy credential too.
                assert_eq!(client.api_key(), "tok-ant");
            }
            other => panic!("expected openai-compatible handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_anthropic_proxy_without_credentials_fails() {
        let config = config_with(
            ModelFamily::Anthropic,
            None,
            None,
            Some("https://proxy.example.com"),
        );
        let err = resolve_model(&config, Some("claude-3-x")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("proxy"));
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = config_with(ModelFamily::OpenAi, None, None, None);
        let err = resolve_model(&config, Some("gpt-4")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("OpenAI"));
    }

    #[test]
    fn test_openai_base_url_override() {
        let config = config_with(
            ModelFamily::OpenAi,
            Some("sk-oai"),
            None,
            Some("https://gateway.example.com/v1"),
        );
        let handle = resolve_model(&config, Some("gpt-4")).unwrap();
        match handle {
            ModelHandle::OpenAi(client) => {
                assert_eq!(client.base_url(), "https://gateway.example.com/v1");
            }
            other => panic!("expected openai handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_openai_default_endpoint() {
        let config = config_with(ModelFamily::OpenAi, Some("sk-oai"), None, None);
        let handle = resolve_model(&config, Some("gpt-4")).unwrap();
        match handle {
            ModelHandle::OpenAi(client) => {
                assert_eq!(client.base_url(), openai::DEFAULT_BASE_URL);
            }
            other => panic!("expected openai handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let config = config_with(ModelFamily::OpenAi, Some("sk-oai"), None, Some("not a url"));
        let err = resolve_model(&config, Some("gpt-4")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("base URL"));
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = config_with(ModelFamily::Google, None, None, None);
        let err = resolve_model(&config, Some("gemini-pro")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message.contains("Google"));
    }

    #[test]
    fn test_gemini_with_api_key() {
        let config = config_with(ModelFamily::Google, Some("sk-goog"), None, None);
        let handle = resolve_model(&config, Some("gemini-pro")).unwrap();
        match handle {
            ModelHandle::Gemini(client) => {
                assert_eq!(client.model(), "gemini-pro");
                assert_eq!(client.api_key(), "sk-goog");
            }
            other => panic!("expected gemini handle, got {}", other.describe()),
        }
    }

    #[test]
    fn test_unknown_model_passes_through() {
        let config = Config::default();
        let handle = resolve_model(&config, Some("llama-3-70b")).unwrap();
        match handle {
            ModelHandle::Passthrough(model) => assert_eq!(model, "llama-3-70b"),
            other => panic!("expected passthrough, got {}", other.describe()),
        }
    }

    #[test]
    fn test_absent_model_id_uses_configured_default() {
        let mut config = config_with(ModelFamily::Anthropic, Some("sk-ant"), None, None);
        config.model = "claude-test-1".to_string();
        let handle = resolve_model(&config, None).unwrap();
        assert_eq!(handle.model(), "claude-test-1");

        // Blank model ids count as absent.
        let handle = resolve_model(&config, Some("  ")).unwrap();
        assert_eq!(handle.model(), "claude-test-1");
    }
}
