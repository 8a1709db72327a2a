//! Configuration loading and credential/endpoint resolution.
//!
//! All reads are synchronous and side-effect free. Missing values are
//! represented as `None`; callers decide whether absence is fatal.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::ModelFamily;

pub mod paths {
    //! Path resolution for runa configuration and data directories.
    //!
    //! RUNA_HOME resolution order:
    //! 1. RUNA_HOME environment variable (if set)
    //! 2. ~/.config/runa (default)

    use std::path::PathBuf;

    /// Returns the runa home directory.
    ///
    /// Checks RUNA_HOME env var first, falls back to ~/.config/runa
    pub fn runa_home() -> PathBuf {
        if let Ok(home) = std::env::var("RUNA_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("runa"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        runa_home().join("config.toml")
    }

    /// Returns the path to the per-thread checkpoint directory.
    pub fn checkpoints_dir() -> PathBuf {
        runa_home().join("checkpoints")
    }

    /// Returns the checkpoint store path for one conversation thread.
    pub fn thread_checkpoint_path(thread_id: &str) -> PathBuf {
        checkpoints_dir().join(format!("{thread_id}.jsonl"))
    }
}

/// Per-provider credentials and endpoint overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Auth token; takes precedence over `api_key` when both are set.
    pub auth_token: Option<String>,
    /// Base URL override (proxy or custom endpoint).
    pub base_url: Option<String>,
}

impl CredentialsConfig {
    /// Returns the API key, treating empty/whitespace values as absent.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Returns the auth token, treating empty/whitespace values as absent.
    pub fn effective_auth_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Returns the base URL override, treating empty/whitespace values as absent.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Returns the effective credential: auth token when present, else API key.
    pub fn effective_credential(&self) -> Option<&str> {
        self.effective_auth_token().or_else(|| self.effective_api_key())
    }
}

/// Provider configuration sections, one per model family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: CredentialsConfig,
    pub openai: CredentialsConfig,
    pub google: CredentialsConfig,
}

impl ProvidersConfig {
    /// Returns the credentials section for a model family.
    pub fn get(&self, family: ModelFamily) -> &CredentialsConfig {
        match family {
            ModelFamily::Anthropic => &self.anthropic,
            ModelFamily::OpenAi => &self.openai,
            ModelFamily::Google => &self.google,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The default model used when a caller does not pick one.
    pub model: String,

    /// Provider credentials and endpoint overrides.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the configured default model identifier.
    pub fn default_model(&self) -> &str {
        &self.model
    }

    /// Returns the credentials section for a model family.
    pub fn credentials(&self, family: ModelFamily) -> &CredentialsConfig {
        self.providers.get(family)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            providers: ProvidersConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, Config::DEFAULT_MODEL);
        assert!(config.providers.anthropic.effective_api_key().is_none());
    }

    #[test]
    fn test_provider_sections_loaded_from_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "model = \"gpt-4\"\n\
             [providers.anthropic]\n\
             auth_token = \"tok-123\"\n\
             base_url = \"https://proxy.example.com\"\n\
             [providers.openai]\n\
             api_key = \"sk-456\"\n"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.default_model(), "gpt-4");

        let anthropic = config.credentials(ModelFamily::Anthropic);
        assert_eq!(anthropic.effective_auth_token(), Some("tok-123"));
        assert_eq!(
            anthropic.effective_base_url(),
            Some("https://proxy.example.com")
        );

        let openai = config.credentials(ModelFamily::OpenAi);
        assert_eq!(openai.effective_api_key(), Some("sk-456"));
        assert!(openai.effective_base_url().is_none());
    }

    #[test]
    fn test_blank_values_treated_as_absent() {
        let creds = CredentialsConfig {
            api_key: Some("   ".to_string()),
            auth_token: Some(String::new()),
            base_url: Some(" \t".to_string()),
        };
        assert!(creds.effective_api_key().is_none());
        assert!(creds.effective_auth_token().is_none());
        assert!(creds.effective_base_url().is_none());
        assert!(creds.effective_credential().is_none());
    }

    #[test]
    fn test_auth_token_takes_precedence_over_api_key() {
        let creds = CredentialsConfig {
            api_key: Some("sk-key".to_string()),
            auth_token: Some("tok-token".to_string()),
            base_url: None,
        };
        assert_eq!(creds.effective_credential(), Some("tok-token"));

        let key_only = CredentialsConfig {
            api_key: Some("sk-key".to_string()),
            auth_token: None,
            base_url: None,
        };
        assert_eq!(key_only.effective_credential(), Some("sk-key"));
    }
}
