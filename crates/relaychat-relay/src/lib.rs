//! HTTP relay for relaychat.
//!
//! Clients post their conversation to `POST /api/chat`; the relay forwards
//! it to the configured provider with a key that only the server holds and
//! answers with `{"text": ...}` or `{"error": ...}`.
//!
//! - `POST /api/chat` -- one exchange.
//! - `GET /api/health` -- liveness and the configured upstream.

pub mod api;
pub mod server;
pub mod state;

use relaychat_core::attachment::DEFAULT_MAX_ATTACHMENT_BYTES;

pub use server::RelayServer;
pub use state::AppState;

/// Body space reserved for the message text and earlier turns, on top of the
/// newest attachment.  Attachments in earlier turns count against it too.
pub const HISTORY_ALLOWANCE_BYTES: usize = 8 * 1024 * 1024;

/// Relay listener configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Largest accepted `POST /api/chat` body, in bytes.
    pub max_body_bytes: usize,
}

impl RelayConfig {
    /// Body limit that fits an attachment of `max_attachment_bytes` after
    /// base64 encoding, plus [`HISTORY_ALLOWANCE_BYTES`].
    pub fn body_limit_for(max_attachment_bytes: usize) -> usize {
        max_attachment_bytes
            .div_ceil(3)
            .saturating_mul(4)
            .saturating_add(HISTORY_ALLOWANCE_BYTES)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            max_body_bytes: Self::body_limit_for(DEFAULT_MAX_ATTACHMENT_BYTES),
        }
    }
}
