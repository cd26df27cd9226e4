//! LLM integration layer.
//!
//! - [`client`] -- HTTP client for OpenAI, Gemini and the relay.
//! - [`wire`] -- Provider-specific request bodies and reply paths.

pub mod client;
pub mod wire;

pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use wire::{RelayErrorBody, RelayReply, RelayRequest};
