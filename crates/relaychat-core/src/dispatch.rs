//! Request dispatch.
//!
//! The [`Dispatcher`] takes an [`Outbound`] produced by
//! [`ChatSession::begin_send`](crate::session::ChatSession::begin_send),
//! sends it through a [`ChatBackend`], and races the call against the
//! outbound's cancellation token.  Replies are normalized for display before
//! they are returned.

use std::sync::Arc;

use async_trait::async_trait;

use crate::conversation::Turn;
use crate::error::{ChatError, Result};
use crate::session::{ChatSession, Outbound};
use crate::text::normalize_reply;

/// Anything that can turn an ordered history into a reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the turns (newest user turn last) and return the raw reply text.
    async fn complete(&self, turns: &[Turn]) -> Result<String>;

    /// A short label for status lines and logs.
    fn describe(&self) -> String;
}

/// Sends outbound requests through a shared backend.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ChatBackend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// The backend requests go through.
    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Send one outbound request.
    ///
    /// Resolves to [`ChatError::Cancelled`] as soon as the outbound's token is
    /// cancelled, dropping the in-flight HTTP call.  No retries.
    pub async fn dispatch(&self, outbound: &Outbound) -> Result<String> {
        if outbound.cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = outbound.cancel.cancelled() => {
                tracing::debug!(request_id = outbound.id, "dispatch cancelled");
                Err(ChatError::Cancelled)
            }
            result = self.backend.complete(&outbound.history) => {
                result.map(|raw| normalize_reply(&raw))
            }
        }
    }

    /// Run a full exchange on `session`: stage the user turn, dispatch it, and
    /// record the outcome.
    ///
    /// Returns the normalized reply on success.  Either way the session is
    /// idle again and its pending attachment is empty afterwards.
    pub async fn exchange(&self, session: &mut ChatSession, text: &str) -> Result<String> {
        let outbound = session.begin_send(text)?;
        let outcome = self.dispatch(&outbound).await;
        session.finish(outbound.id, outcome)
    }
}
