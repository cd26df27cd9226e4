//! Client configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! the environment (a `.env` file is loaded first via `dotenvy`).  API keys
//! are only ever read from the environment and are never written back out.
//!
//! | variable | field |
//! |---|---|
//! | `RELAYCHAT_PROVIDER` | `provider` (`openai`, `gemini`, `relay`) |
//! | `RELAYCHAT_MODEL` | `model` |
//! | `RELAYCHAT_RELAY_URL` | `relay_url` |
//! | `RELAYCHAT_REVEAL_MS` | `reveal_interval_ms` |
//! | `RELAYCHAT_STORE` | `store_path` |
//! | `OPENAI_API_KEY` / `GEMINI_API_KEY` | provider credentials |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::error::{ChatError, Result};
use crate::llm::client::{
    GEMINI_DEFAULT_MODEL, LlmClientConfig, LlmProvider, OPENAI_DEFAULT_MODEL, RELAY_BASE_URL,
};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "relaychat.toml";

/// Settings shared by the TUI, the one-shot `ask` command and the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Where chat requests go.  Defaults to the relay so the client holds no
    /// provider credential.
    pub provider: LlmProvider,
    /// Model override; each provider has its own default.
    pub model: Option<String>,
    /// Base URL of the relay.
    pub relay_url: String,
    /// Milliseconds between revealed words.
    pub reveal_interval_ms: u64,
    /// Largest file that may be attached.
    pub max_attachment_bytes: usize,
    /// SQLite file holding the saved conversation.
    pub store_path: PathBuf,
    /// Whether to save and restore the conversation.
    pub persist: bool,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Relay,
            model: None,
            relay_url: RELAY_BASE_URL.to_owned(),
            reveal_interval_ms: 40,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            store_path: PathBuf::from("data/relaychat.db"),
            persist: true,
            openai_api_key: None,
            gemini_api_key: None,
        }
    }
}

impl ChatConfig {
    /// Load defaults, the config file, `.env`, then the process environment.
    ///
    /// An explicit `path` must exist; without one, `relaychat.toml` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Ok(env_path) = dotenvy::dotenv() {
            tracing::debug!(path = %env_path.display(), "loaded .env");
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ChatError::Config {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ChatError::Config {
            reason: format!("invalid config: {e}"),
        })
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("RELAYCHAT_PROVIDER") {
            self.provider = LlmProvider::parse(&provider)?;
        }
        if let Some(model) = non_empty("RELAYCHAT_MODEL") {
            self.model = Some(model);
        }
        if let Some(url) = non_empty("RELAYCHAT_RELAY_URL") {
            self.relay_url = url;
        }
        if let Some(ms) = non_empty("RELAYCHAT_REVEAL_MS") {
            self.reveal_interval_ms = ms.trim().parse().map_err(|e| ChatError::Config {
                reason: format!("RELAYCHAT_REVEAL_MS must be an integer: {e}"),
            })?;
        }
        if let Some(store) = non_empty("RELAYCHAT_STORE") {
            self.store_path = PathBuf::from(store);
        }
        self.openai_api_key = non_empty("OPENAI_API_KEY").or(self.openai_api_key.take());
        self.gemini_api_key = non_empty("GEMINI_API_KEY").or(self.gemini_api_key.take());
        Ok(())
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }

    /// Client settings for the configured provider.
    pub fn client_config(&self) -> Result<LlmClientConfig> {
        self.client_config_for(&self.provider)
    }

    /// Client settings for a specific provider (the relay uses this to pick
    /// its upstream).
    pub fn client_config_for(&self, provider: &LlmProvider) -> Result<LlmClientConfig> {
        let missing = |env_var: &str| ChatError::MissingCredential {
            env_var: env_var.to_owned(),
        };

        match provider {
            LlmProvider::OpenAI => {
                let key = self
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| missing("OPENAI_API_KEY"))?;
                let model = self.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
                Ok(LlmClientConfig::openai(key, model))
            }
            LlmProvider::Gemini => {
                let key = self
                    .gemini_api_key
                    .clone()
                    .ok_or_else(|| missing("GEMINI_API_KEY"))?;
                let model = self.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL);
                Ok(LlmClientConfig::gemini(key, model))
            }
            LlmProvider::Relay => Ok(LlmClientConfig::relay(&self.relay_url)),
        }
    }
}
