//! Shared application state for the relay.

use std::sync::Arc;

use relaychat_core::{ChatBackend, ChatConfig, ChatError, LlmClient, LlmProvider, Result};

/// State shared by every request handler.
pub struct AppState {
    /// Upstream provider requests are forwarded to.
    pub provider: LlmProvider,
    /// `None` when the provider's key is not configured; each chat request
    /// then fails with a 500 naming the missing variable.
    pub backend: Option<Arc<dyn ChatBackend>>,
}

impl AppState {
    pub fn new(provider: LlmProvider, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            provider,
            backend: Some(backend),
        }
    }

    /// A relay whose upstream key is missing.
    pub fn unconfigured(provider: LlmProvider) -> Self {
        Self {
            provider,
            backend: None,
        }
    }

    /// Build the upstream client from configuration.
    ///
    /// `upstream` overrides the configured provider.  Without it the
    /// configured provider is used, unless that is the relay itself, in which
    /// case Gemini is the upstream.  A missing key is not fatal: the relay
    /// still starts and reports the problem per request.
    pub fn from_config(config: &ChatConfig, upstream: Option<LlmProvider>) -> Result<Self> {
        let provider = upstream.unwrap_or_else(|| match config.provider {
            LlmProvider::Relay => LlmProvider::Gemini,
            ref other => other.clone(),
        });
        if provider == LlmProvider::Relay {
            return Err(ChatError::Config {
                reason: "the relay cannot forward to another relay".into(),
            });
        }

        match config.client_config_for(&provider).and_then(LlmClient::new) {
            Ok(client) => {
                tracing::info!(upstream = %client.describe(), "relay upstream configured");
                Ok(Self::new(provider, Arc::new(client)))
            }
            Err(ChatError::MissingCredential { env_var }) => {
                tracing::warn!(env_var = %env_var, "provider key missing; chat requests will fail");
                Ok(Self::unconfigured(provider))
            }
            Err(e) => Err(e),
        }
    }

    /// The error returned while no key is configured.
    pub fn missing_credential(&self) -> ChatError {
        ChatError::MissingCredential {
            env_var: self
                .provider
                .key_env_var()
                .unwrap_or("API_KEY")
                .to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_still_builds_state() {
        let state = AppState::from_config(&ChatConfig::default(), None).unwrap();
        assert_eq!(state.provider, LlmProvider::Gemini);
        assert!(state.backend.is_none());
        assert_eq!(
            state.missing_credential().to_string(),
            "GEMINI_API_KEY not configured."
        );
    }

    #[test]
    fn explicit_upstream_wins() {
        let config = ChatConfig {
            openai_api_key: Some("sk-test".into()),
            ..ChatConfig::default()
        };
        let state = AppState::from_config(&config, Some(LlmProvider::OpenAI)).unwrap();
        assert_eq!(state.provider, LlmProvider::OpenAI);
        assert!(state.backend.is_some());
    }

    #[test]
    fn relay_cannot_target_itself() {
        let err = AppState::from_config(&ChatConfig::default(), Some(LlmProvider::Relay));
        assert!(matches!(err, Err(ChatError::Config { .. })));
    }
}
