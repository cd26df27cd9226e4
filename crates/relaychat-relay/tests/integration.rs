//! Integration tests for relay configuration and state construction.

use relaychat_core::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;
use relaychat_core::{ChatConfig, LlmProvider};
use relaychat_relay::{AppState, HISTORY_ALLOWANCE_BYTES, RelayConfig, RelayServer};

#[test]
fn relay_config_defaults() {
    let config = RelayConfig::default();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(
        config.max_body_bytes,
        RelayConfig::body_limit_for(DEFAULT_MAX_ATTACHMENT_BYTES)
    );
}

#[test]
fn body_limit_fits_a_base64_attachment() {
    // 20 MiB of raw bytes grows to about 26.7 MiB as base64.
    let limit = RelayConfig::body_limit_for(DEFAULT_MAX_ATTACHMENT_BYTES);
    assert!(limit >= DEFAULT_MAX_ATTACHMENT_BYTES * 4 / 3 + HISTORY_ALLOWANCE_BYTES);
    assert!(limit > 2 * 1024 * 1024);

    assert_eq!(RelayConfig::body_limit_for(3), 4 + HISTORY_ALLOWANCE_BYTES);
    assert_eq!(RelayConfig::body_limit_for(usize::MAX), usize::MAX);
}

#[test]
fn server_addr_uses_config() {
    let server = RelayServer::new(
        RelayConfig {
            bind_addr: "0.0.0.0".into(),
            port: 8080,
            ..RelayConfig::default()
        },
        AppState::unconfigured(LlmProvider::Gemini),
    );
    assert_eq!(server.addr(), "0.0.0.0:8080");
}

#[test]
fn configured_provider_becomes_upstream() {
    let config = ChatConfig {
        provider: LlmProvider::OpenAI,
        openai_api_key: Some("sk-test".into()),
        ..ChatConfig::default()
    };
    let state = AppState::from_config(&config, None).unwrap();
    assert_eq!(state.provider, LlmProvider::OpenAI);
    assert!(state.backend.is_some());
}
