//! Conversation session.
//!
//! [`ChatSession`] owns every piece of mutable chat state: the history, the
//! staged attachment, and the handle of the single in-flight request.  The
//! send path is split in two so the network call can run on another task:
//!
//! ```text
//! begin_send(text) ──> Outbound { id, history, cancel } ──> Dispatcher
//!                                                             │
//! finish(id, outcome) <───────────────────────────────────────┘
//! ```
//!
//! `finish` is the only place a model turn is appended, and it clears the
//! busy state and the staged attachment on every outcome.

use tokio_util::sync::CancellationToken;

use crate::attachment::PendingAttachment;
use crate::conversation::{ConversationStore, Turn};
use crate::error::{ChatError, Result};

/// Everything a dispatcher needs for one request.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Identifies the request when its outcome comes back.
    pub id: u64,
    /// Full history, newest user turn last.
    pub history: Vec<Turn>,
    /// Cancelled when the user stops the response.
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    cancel: CancellationToken,
}

/// Owner of history, pending attachment and in-flight request state.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: ConversationStore,
    pending: Option<PendingAttachment>,
    in_flight: Option<InFlight>,
    next_id: u64,
}

impl ChatSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session seeded with restored turns.
    pub fn with_history(turns: Vec<Turn>) -> Self {
        Self {
            history: ConversationStore::from_turns(turns),
            ..Self::default()
        }
    }

    /// Drop history and staged attachment, and stop any pending request.
    pub fn reset(&mut self) {
        self.cancel();
        self.history.clear();
        tracing::debug!("session reset");
    }

    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    /// Whether a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    // -- Attachments --------------------------------------------------------

    /// Stage a file for the next send, replacing any file already staged.
    pub fn stage_attachment(&mut self, attachment: PendingAttachment) {
        if let Some(previous) = self.pending.replace(attachment) {
            tracing::debug!(file = %previous.file_name, "replaced staged attachment");
        }
    }

    /// Discard the staged file, returning it.
    pub fn cancel_attachment(&mut self) -> Option<PendingAttachment> {
        self.pending.take()
    }

    pub fn pending_attachment(&self) -> Option<&PendingAttachment> {
        self.pending.as_ref()
    }

    // -- Send path ----------------------------------------------------------

    /// Append the user turn and hand back everything needed to dispatch it.
    ///
    /// The staged attachment is moved into the turn.  Fails with
    /// [`ChatError::Busy`] while another request is pending and with
    /// [`ChatError::EmptyMessage`] when there is neither text nor a file.
    pub fn begin_send(&mut self, text: &str) -> Result<Outbound> {
        if self.is_busy() {
            return Err(ChatError::Busy);
        }

        let text = text.trim();
        if text.is_empty() && self.pending.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        let attachment = self.pending.take().map(PendingAttachment::into_inline);
        self.history
            .append(Turn::user_with_attachment(text, attachment));

        self.next_id += 1;
        let id = self.next_id;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            id,
            cancel: cancel.clone(),
        });

        tracing::debug!(request_id = id, turns = self.history.len(), "send started");

        Ok(Outbound {
            id,
            history: self.history.snapshot(),
            cancel,
        })
    }

    /// Record the outcome of request `id`.
    ///
    /// A successful reply is appended as a model turn.  Outcomes for a request
    /// that was cancelled or superseded are treated as cancellations and never
    /// touch history.  Returns the effective outcome.
    pub fn finish(&mut self, id: u64, outcome: Result<String>) -> Result<String> {
        self.pending = None;

        let current = self.in_flight.as_ref().is_some_and(|f| f.id == id);
        if !current {
            tracing::debug!(request_id = id, "dropping outcome of stale request");
            return Err(ChatError::Cancelled);
        }

        let cancelled = self
            .in_flight
            .take()
            .is_some_and(|f| f.cancel.is_cancelled());

        match outcome {
            Ok(_) if cancelled => Err(ChatError::Cancelled),
            Ok(reply) => {
                self.history.append(Turn::model(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(request_id = id, error = %e, "send failed");
                }
                Err(e)
            }
        }
    }

    /// Stop the pending request, if any, and discard the staged attachment.
    ///
    /// Returns `true` when a request was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        self.pending = None;
        match self.in_flight.take() {
            Some(flight) => {
                flight.cancel.cancel();
                tracing::debug!(request_id = flight.id, "request cancelled");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    fn file(name: &str) -> PendingAttachment {
        PendingAttachment::new(name, "image/png", vec![0xAA])
    }

    #[test]
    fn staging_replaces_previous_attachment() {
        let mut session = ChatSession::new();
        session.stage_attachment(file("first.png"));
        session.stage_attachment(file("second.png"));
        assert_eq!(session.pending_attachment().unwrap().file_name, "second.png");

        let outbound = session.begin_send("look").unwrap();
        let user = outbound.history.last().unwrap();
        assert_eq!(user.parts.len(), 2);
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn cancel_attachment_discards_it() {
        let mut session = ChatSession::new();
        session.stage_attachment(file("a.png"));
        assert_eq!(session.cancel_attachment().unwrap().file_name, "a.png");
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn empty_send_is_rejected() {
        let mut session = ChatSession::new();
        assert!(matches!(session.begin_send("   "), Err(ChatError::EmptyMessage)));
        assert!(session.history().is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn attachment_alone_can_be_sent() {
        let mut session = ChatSession::new();
        session.stage_attachment(file("only.png"));
        let outbound = session.begin_send("").unwrap();
        assert!(outbound.history[0].attachment().is_some());
    }

    #[test]
    fn second_send_while_busy_is_rejected() {
        let mut session = ChatSession::new();
        session.begin_send("one").unwrap();
        assert!(matches!(session.begin_send("two"), Err(ChatError::Busy)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn finish_success_appends_model_turn() {
        let mut session = ChatSession::new();
        let outbound = session.begin_send("hi").unwrap();
        assert!(session.is_busy());

        let reply = session.finish(outbound.id, Ok("hello".into())).unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().last().unwrap().role, Role::Model);
        assert!(!session.is_busy());
    }

    #[test]
    fn finish_after_cancel_is_dropped() {
        let mut session = ChatSession::new();
        session.stage_attachment(file("x.png"));
        let outbound = session.begin_send("hi").unwrap();

        assert!(session.cancel());
        assert!(outbound.cancel.is_cancelled());
        assert!(!session.is_busy());

        // The reply raced the cancellation and arrived anyway.
        let err = session.finish(outbound.id, Ok("late".into())).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(session.history().len(), 1);
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn cancelled_token_suppresses_success() {
        let mut session = ChatSession::new();
        let outbound = session.begin_send("hi").unwrap();
        outbound.cancel.cancel();

        let err = session.finish(outbound.id, Ok("raced".into())).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn attachment_staged_during_flight_is_cleared_on_finish() {
        let mut session = ChatSession::new();
        let outbound = session.begin_send("hi").unwrap();
        session.stage_attachment(file("late.png"));

        let _ = session.finish(
            outbound.id,
            Err(ChatError::Transport {
                reason: "reset".into(),
            }),
        );
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = ChatSession::with_history(vec![Turn::user("a"), Turn::model("b")]);
        session.stage_attachment(file("x.png"));
        let outbound = session.begin_send("c").unwrap();

        session.reset();
        assert!(session.history().is_empty());
        assert!(session.pending_attachment().is_none());
        assert!(!session.is_busy());
        assert!(outbound.cancel.is_cancelled());
    }

    #[test]
    fn cancel_when_idle_reports_nothing() {
        let mut session = ChatSession::new();
        assert!(!session.cancel());
    }
}
