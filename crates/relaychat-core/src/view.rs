//! View model for the conversation pane.
//!
//! Turns are mapped to [`MessageView`]s, plain render instructions that a
//! front end draws however it likes.  Nothing here produces markup, so the
//! persisted record stays pure data.

use crate::attachment::PendingAttachment;
use crate::conversation::{Role, Turn};

/// Placeholder shown while the model reply is pending.
pub const TYPING_PLACEHOLDER: &str = "Typing...";

/// How a message should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Model,
    /// A failed send; shown in an error style.
    Error,
    /// Local information (help text, attachment notices, ...).
    Notice,
}

/// One message as the view should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub kind: MessageKind,
    pub text: String,
    /// Label of an attached file, e.g. `[image: cat.png]`.
    pub attachment: Option<String>,
    /// Reply still pending or being revealed.
    pub loading: bool,
}

impl MessageView {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            attachment: None,
            loading: false,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Notice, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    /// The bubble shown while waiting for the model.
    pub fn pending_reply() -> Self {
        Self {
            loading: true,
            ..Self::new(MessageKind::Model, TYPING_PLACEHOLDER)
        }
    }

    /// The bubble for a user turn that is about to be sent.
    pub fn outgoing(text: &str, attachment: Option<&PendingAttachment>) -> Self {
        Self {
            attachment: attachment.map(|a| attachment_label(a.is_image, &a.file_name)),
            ..Self::new(MessageKind::User, text)
        }
    }
}

/// Render a stored turn.  Stored turns keep no file name, so the label only
/// says whether the attachment is an image.
pub fn render_turn(turn: &Turn) -> MessageView {
    let kind = match turn.role {
        Role::User => MessageKind::User,
        Role::Model => MessageKind::Model,
    };
    MessageView {
        attachment: turn.attachment().map(|a| {
            if a.mime_type.starts_with("image/") {
                "[image]".to_owned()
            } else {
                "[file]".to_owned()
            }
        }),
        ..MessageView::new(kind, turn.text())
    }
}

/// Render a whole history, oldest first.
pub fn render_history<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> Vec<MessageView> {
    turns.into_iter().map(render_turn).collect()
}

fn attachment_label(is_image: bool, name: &str) -> String {
    if is_image {
        format!("[image: {name}]")
    } else {
        format!("[file: {name}]")
    }
}
