//! Chat error types.
//!
//! Every failure on the send path surfaces through [`ChatError`].  The
//! `Display` text of each variant is what the conversation view shows, so the
//! variants that reach the user carry short, human-readable messages.

/// Message shown when the network layer fails before a provider answers.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to communicate with the model provider.";

/// Message shown when the user stops a pending response.
pub const CANCELLED_MESSAGE: &str = "Response generation stopped.";

/// Unified error type for the chat core.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    // -- Provider errors -----------------------------------------------------
    /// The provider answered with a non-success status.  `message` is the
    /// provider's own error text, shown verbatim.
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// The request never got an answer (DNS, connect, TLS, timeout ...).
    /// `reason` is kept for logs only.
    #[error("Failed to communicate with the model provider.")]
    Transport { reason: String },

    /// The reply did not carry text at the provider's fixed path.
    #[error("malformed provider response: {reason}")]
    MalformedResponse { reason: String },

    /// The user stopped the pending request.
    #[error("Response generation stopped.")]
    Cancelled,

    // -- Session errors ------------------------------------------------------
    /// A send was attempted while another one is still pending.
    #[error("a response is already being generated")]
    Busy,

    /// Nothing to send: empty text and no staged attachment.
    #[error("message is empty")]
    EmptyMessage,

    /// A file could not be staged as an attachment.
    #[error("attachment error: {reason}")]
    Attachment { reason: String },

    // -- Configuration errors ------------------------------------------------
    /// A provider that needs a credential was configured without one.
    #[error("{env_var} not configured.")]
    MissingCredential { env_var: String },

    /// Configuration loading or validation failed.
    #[error("config error: {reason}")]
    Config { reason: String },

    // -- Upstream crate errors -----------------------------------------------
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// Whether this error is the user-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, ChatError>;

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_message_verbatim() {
        let err = ChatError::Provider {
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "bad key");
    }

    #[test]
    fn transport_error_hides_reason() {
        let err = ChatError::Transport {
            reason: "connection refused".into(),
        };
        assert_eq!(err.to_string(), TRANSPORT_FAILURE_MESSAGE);
    }

    #[test]
    fn cancelled_is_distinct() {
        assert!(ChatError::Cancelled.is_cancelled());
        assert_eq!(ChatError::Cancelled.to_string(), CANCELLED_MESSAGE);
        assert!(!ChatError::Busy.is_cancelled());
    }

    #[test]
    fn missing_credential_names_variable() {
        let err = ChatError::MissingCredential {
            env_var: "OPENAI_API_KEY".into(),
        };
        assert_eq!(err.to_string(), "OPENAI_API_KEY not configured.");
    }
}
