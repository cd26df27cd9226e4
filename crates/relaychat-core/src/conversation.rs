//! Conversation data model.
//!
//! A conversation is an ordered, append-only sequence of [`Turn`]s.  The
//! serde shape of a turn is the Gemini `contents` entry
//! (`{"role": .., "parts": [{"text": ..} | {"inline_data": {..}}]}`), which
//! is also what the relay endpoint and the local transcript store accept.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Turns and parts
// ---------------------------------------------------------------------------

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input from the person at the keyboard.
    User,
    /// Output from the language model.
    Model,
}

/// Inline file content carried by a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineData {
    /// MIME type reported to the provider (e.g. `image/png`).
    pub mime_type: String,
    /// Raw bytes; base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// A unit of turn content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

impl Part {
    /// Create a text part.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text { text: value.into() }
    }

    /// Create an inline data part.
    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data,
            },
        }
    }

    /// Return the text if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineData { .. } => None,
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// A user turn with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// A user turn with text and at most one inline attachment.
    pub fn user_with_attachment(text: impl Into<String>, attachment: Option<InlineData>) -> Self {
        let mut parts = vec![Part::text(text)];
        if let Some(inline_data) = attachment {
            parts.push(Part::InlineData { inline_data });
        }
        Self {
            role: Role::User,
            parts,
        }
    }

    /// A model turn with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenate all text parts, separated by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The inline attachment of this turn, if any.
    pub fn attachment(&self) -> Option<&InlineData> {
        self.parts.iter().find_map(|p| match p {
            Part::InlineData { inline_data } => Some(inline_data),
            Part::Text { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Conversation store
// ---------------------------------------------------------------------------

/// Ordered, append-only conversation history.
///
/// Turns are never edited or removed individually; [`clear`](Self::clear)
/// empties the whole sequence.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted turns.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Add a turn at the end.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The full ordered sequence, for request construction.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// base64 serde helper
// ---------------------------------------------------------------------------

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_keeps_insertion_order() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("one"));
        store.append(Turn::model("two"));
        store.append(Turn::user("three"));

        let texts: Vec<String> = store.iter().map(Turn::text).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(store.last().map(|t| t.role), Some(Role::User));
    }

    #[test]
    fn clear_empties_store() {
        let mut store = ConversationStore::from_turns(vec![Turn::user("a"), Turn::model("b")]);
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_store() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("a"));
        let snap = store.snapshot();
        store.append(Turn::model("b"));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn turn_serializes_to_gemini_shape() {
        let turn = Turn::user_with_attachment(
            "look",
            Some(InlineData {
                mime_type: "text/plain".into(),
                data: b"hi".to_vec(),
            }),
        );
        let v = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            v,
            json!({
                "role": "user",
                "parts": [
                    {"text": "look"},
                    {"inline_data": {"mime_type": "text/plain", "data": "aGk="}}
                ]
            })
        );
    }

    #[test]
    fn turn_deserializes_inline_data() {
        let v = json!({
            "role": "user",
            "parts": [{"text": "x"}, {"inline_data": {"mime_type": "image/png", "data": "AAE="}}]
        });
        let turn: Turn = serde_json::from_value(v).unwrap();
        let att = turn.attachment().unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.data, vec![0u8, 1]);
        assert_eq!(turn.text(), "x");
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let v = json!({
            "role": "user",
            "parts": [{"inline_data": {"mime_type": "image/png", "data": "!!!"}}]
        });
        assert!(serde_json::from_value::<Turn>(v).is_err());
    }
}
