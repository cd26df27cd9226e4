//! Core of relaychat.
//!
//! Everything a chat front end needs apart from drawing: the conversation
//! model, the session that owns it, provider wire formats, the dispatcher
//! that sends a turn and can be cancelled, and the typewriter reveal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ begin_send ┌────────────┐ complete ┌─────────────┐
//! │ ChatSession  │───────────>│ Dispatcher │─────────>│ ChatBackend │
//! │ (history,    │<───────────│ (cancel)   │<─────────│ (LlmClient) │
//! │  attachment) │   finish   └────────────┘          └─────────────┘
//! └──────┬───────┘
//!        │ reply
//!        v
//! ┌──────────────┐
//! │  Typewriter  │ word-by-word reveal
//! └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`conversation`] -- Turns, parts and the append-only store.
//! - [`attachment`] -- Staged file attachments.
//! - [`session`] -- Session state and the two-phase send path.
//! - [`dispatch`] -- Backend trait and cancellable dispatch.
//! - [`llm`] -- HTTP client and provider wire formats.
//! - [`reveal`] -- Typewriter state machine and timer driver.
//! - [`view`] -- Render instructions for front ends.
//! - [`text`] -- Reply normalization.
//! - [`config`] -- Layered configuration.
//! - [`error`] -- Error types.

pub mod attachment;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod reveal;
pub mod session;
pub mod text;
pub mod view;

// Re-export the most commonly used types at the crate root.
pub use attachment::PendingAttachment;
pub use config::ChatConfig;
pub use conversation::{ConversationStore, InlineData, Part, Role, Turn};
pub use dispatch::{ChatBackend, Dispatcher};
pub use error::{CANCELLED_MESSAGE, ChatError, Result, TRANSPORT_FAILURE_MESSAGE};
pub use llm::{
    LlmClient, LlmClientConfig, LlmProvider, RelayErrorBody, RelayReply, RelayRequest,
};
pub use reveal::{RevealEvent, RevealHandle, RevealState, Typewriter, spawn_reveal};
pub use session::{ChatSession, Outbound};
pub use text::{normalize_reply, strip_bold};
pub use view::{MessageKind, MessageView};
