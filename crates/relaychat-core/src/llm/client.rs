//! Multi-provider LLM client.
//!
//! Talks to the **OpenAI Chat Completions API**, the **Gemini
//! `generateContent` API**, or a **relaychat relay** that holds the provider
//! credential server-side.  Every call is a single non-streaming POST.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::Turn;
use crate::dispatch::ChatBackend;
use crate::error::{ChatError, Result};
use crate::llm::wire;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default local relay URL.
pub const RELAY_BASE_URL: &str = "http://127.0.0.1:3000";

/// Default OpenAI model.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default Gemini model.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Upper bound on one round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Provider enum
// ---------------------------------------------------------------------------

/// Identifies which endpoint the client should target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI Chat Completions API.
    OpenAI,
    /// Google Gemini `generateContent` API.
    Gemini,
    /// A relaychat relay (`POST /api/chat`).
    Relay,
}

impl LlmProvider {
    /// Parse a provider name as used in config files and on the command line.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" | "google" => Ok(Self::Gemini),
            "relay" => Ok(Self::Relay),
            other => Err(ChatError::Config {
                reason: format!("unknown provider `{other}` (expected openai, gemini or relay)"),
            }),
        }
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Relay => "relay",
        }
    }

    /// Environment variable holding this provider's credential, if it needs one.
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Relay => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a single endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Which provider this configuration targets.
    pub provider: LlmProvider,
    /// API key for authentication.  Empty for the relay.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Model identifier.  Ignored by the relay, which picks its own.
    pub model: String,
}

impl LlmClientConfig {
    /// Create a configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            model: model.into(),
        }
    }

    /// Create a configuration for the Gemini API.
    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_owned(),
            model: model.into(),
        }
    }

    /// Create a configuration for a relay at `base_url`.
    pub fn relay(base_url: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Relay,
            api_key: String::new(),
            base_url: base_url.into(),
            model: String::new(),
        }
    }

    /// Point the configuration at a different base URL (e.g. a proxy or a
    /// test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The full URL the client POSTs to.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider {
            LlmProvider::OpenAI => format!("{base}/chat/completions"),
            LlmProvider::Gemini => format!("{base}/models/{}:generateContent", self.model),
            LlmProvider::Relay => format!("{base}/api/chat"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A non-streaming chat client for one provider.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// Fails fast with [`ChatError::MissingCredential`] when a provider that
    /// needs a key is configured without one.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if let Some(env_var) = config.provider.key_env_var()
            && config.api_key.trim().is_empty()
        {
            return Err(ChatError::MissingCredential {
                env_var: env_var.to_owned(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// The provider this client targets.
    pub fn provider(&self) -> &LlmProvider {
        &self.config.provider
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send the ordered turns and return the raw reply text.
    pub async fn chat(&self, turns: &[Turn]) -> Result<String> {
        let provider = &self.config.provider;
        let body = wire::request_body(provider, &self.config.model, turns)?;
        let url = self.config.endpoint();

        tracing::debug!(
            url = %url,
            provider = provider.name(),
            turns = turns.len(),
            "sending chat request"
        );

        let resp = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| wire::parse_error(provider, &v))
                .unwrap_or_else(|| format!("API returned {status}"));
            tracing::warn!(status = status.as_u16(), error = %message, "provider returned an error");
            return Err(ChatError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| ChatError::MalformedResponse {
            reason: format!("invalid JSON response: {e}"),
        })?;

        wire::parse_reply(provider, &v)
    }

    /// Build the auth and content-type headers for the current provider.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let invalid = |e: reqwest::header::InvalidHeaderValue| ChatError::Config {
            reason: format!("invalid API key header: {e}"),
        };

        match self.config.provider {
            LlmProvider::OpenAI => {
                let value = format!("Bearer {}", self.config.api_key);
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).map_err(invalid)?);
            }
            LlmProvider::Gemini => {
                headers.insert(
                    "x-goog-api-key",
                    HeaderValue::from_str(&self.config.api_key).map_err(invalid)?,
                );
            }
            LlmProvider::Relay => {}
        }

        Ok(headers)
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        self.chat(turns).await
    }

    fn describe(&self) -> String {
        match self.config.provider {
            LlmProvider::Relay => format!("relay @ {}", self.config.base_url),
            _ => format!("{} / {}", self.config.provider.name(), self.config.model),
        }
    }
}
