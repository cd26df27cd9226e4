//! Provider wire formats.
//!
//! Each provider wants the ordered turns in its own shape and returns the
//! reply text at its own fixed JSON path.  These functions are pure so the
//! shapes can be tested without a network.
//!
//! | provider | request body | reply path | error path |
//! |---|---|---|---|
//! | Gemini | `{"contents": [turn..]}` | `candidates[0].content.parts[0].text` | `error.message` |
//! | OpenAI | `{"model", "messages": [{role, content}]}` | `choices[0].message.content` | `error.message` |
//! | Relay  | `{"message", "history", "attachment"?}` | `text` | `error` |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::conversation::{InlineData, Part, Role, Turn};
use crate::error::{ChatError, Result};
use crate::llm::client::LlmProvider;

// ---------------------------------------------------------------------------
// Relay payloads
// ---------------------------------------------------------------------------

/// Body accepted by the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Text of the newest user turn.
    pub message: String,
    /// Turns that precede the newest one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Turn>,
    /// Inline attachment of the newest user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<InlineData>,
}

impl RelayRequest {
    /// Split an ordered history into the relay shape.  The last turn must be
    /// the user turn being sent.
    pub fn from_turns(turns: &[Turn]) -> Result<Self> {
        let Some((last, history)) = turns.split_last() else {
            return Err(ChatError::EmptyMessage);
        };
        if last.role != Role::User {
            return Err(ChatError::Config {
                reason: "the newest turn sent to the relay must come from the user".into(),
            });
        }

        Ok(Self {
            message: last.text(),
            history: history.to_vec(),
            attachment: last.attachment().cloned(),
        })
    }

    /// Rebuild the ordered turns, newest user turn last.
    pub fn into_turns(self) -> Vec<Turn> {
        let mut turns = self.history;
        turns.push(Turn::user_with_attachment(self.message, self.attachment));
        turns
    }
}

/// Success body returned by the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayReply {
    pub text: String,
}

/// Error body returned by the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
}

impl RelayErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Build the JSON body for the given provider.
pub fn request_body(provider: &LlmProvider, model: &str, turns: &[Turn]) -> Result<Value> {
    match provider {
        LlmProvider::Gemini => Ok(gemini_body(turns)),
        LlmProvider::OpenAI => Ok(openai_body(model, turns)),
        LlmProvider::Relay => Ok(serde_json::to_value(RelayRequest::from_turns(turns)?)?),
    }
}

/// Gemini `generateContent` body: the turns serialize to `contents` as-is.
pub fn gemini_body(turns: &[Turn]) -> Value {
    json!({ "contents": turns })
}

/// OpenAI Chat Completions body.
///
/// OpenAI takes one content string per message, so text parts are joined
/// with newlines.  Attachments with a `text/*` MIME type are inlined as
/// text; anything else becomes a short placeholder.
pub fn openai_body(model: &str, turns: &[Turn]) -> Value {
    let messages: Vec<Value> = turns
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            json!({
                "role": role,
                "content": openai_content(turn),
            })
        })
        .collect();

    json!({
        "model": model,
        "messages": messages,
    })
}

fn openai_content(turn: &Turn) -> String {
    let pieces: Vec<String> = turn
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } if text.is_empty() => None,
            Part::Text { text } => Some(text.clone()),
            Part::InlineData { inline_data } if inline_data.mime_type.starts_with("text/") => {
                Some(String::from_utf8_lossy(&inline_data.data).into_owned())
            }
            Part::InlineData { inline_data } => {
                Some(format!("[attachment: {}]", inline_data.mime_type))
            }
        })
        .collect();
    pieces.join("\n")
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extract the reply text at the provider's fixed path.
///
/// Anything other than a string at that path is a hard failure.
pub fn parse_reply(provider: &LlmProvider, v: &Value) -> Result<String> {
    let (node, path) = match provider {
        LlmProvider::Gemini => (
            &v["candidates"][0]["content"]["parts"][0]["text"],
            "candidates[0].content.parts[0].text",
        ),
        LlmProvider::OpenAI => (&v["choices"][0]["message"]["content"], "choices[0].message.content"),
        LlmProvider::Relay => (&v["text"], "text"),
    };

    node.as_str()
        .map(str::to_owned)
        .ok_or_else(|| ChatError::MalformedResponse {
            reason: format!("missing `{path}` in response"),
        })
}

/// Extract the provider's human-readable error message, if present.
pub fn parse_error(provider: &LlmProvider, v: &Value) -> Option<String> {
    let node = match provider {
        LlmProvider::Gemini | LlmProvider::OpenAI => &v["error"]["message"],
        LlmProvider::Relay => &v["error"],
    };
    node.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> Vec<Turn> {
        vec![
            Turn::user("hello"),
            Turn::model("hi there"),
            Turn::user_with_attachment(
                "what is this",
                Some(InlineData {
                    mime_type: "image/png".into(),
                    data: vec![1, 2, 3],
                }),
            ),
        ]
    }

    #[test]
    fn gemini_body_uses_role_parts_objects() {
        let body = gemini_body(&sample_history());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "hi there");
        assert_eq!(contents[2]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(contents[2]["parts"][1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn openai_body_uses_role_content_strings() {
        let body = openai_body("gpt-3.5-turbo", &sample_history());
        assert_eq!(body["model"], "gpt-3.5-turbo");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "hi there");
        assert_eq!(messages[2]["content"], "what is this\n[attachment: image/png]");
    }

    #[test]
    fn openai_body_inlines_text_attachments() {
        let turn = Turn::user_with_attachment(
            "",
            Some(InlineData {
                mime_type: "text/csv".into(),
                data: b"a,b\n1,2".to_vec(),
            }),
        );
        let body = openai_body("m", &[turn]);
        assert_eq!(body["messages"][0]["content"], "a,b\n1,2");
    }

    #[test]
    fn relay_request_splits_newest_turn() {
        let req = RelayRequest::from_turns(&sample_history()).unwrap();
        assert_eq!(req.message, "what is this");
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.attachment.as_ref().unwrap().data, vec![1, 2, 3]);

        let turns = req.into_turns();
        assert_eq!(turns, sample_history());
    }

    #[test]
    fn relay_request_rejects_model_last() {
        let turns = vec![Turn::user("a"), Turn::model("b")];
        assert!(RelayRequest::from_turns(&turns).is_err());
        assert!(matches!(
            RelayRequest::from_turns(&[]),
            Err(ChatError::EmptyMessage)
        ));
    }

    #[test]
    fn relay_request_accepts_bare_message() {
        let req: RelayRequest = serde_json::from_value(json!({"message": "ping"})).unwrap();
        assert!(req.history.is_empty());
        assert!(req.attachment.is_none());
        assert_eq!(req.into_turns(), vec![Turn::user("ping")]);
    }

    #[test]
    fn parse_gemini_reply() {
        let v = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello!"}]}}]
        });
        assert_eq!(parse_reply(&LlmProvider::Gemini, &v).unwrap(), "Hello!");
    }

    #[test]
    fn parse_openai_reply() {
        let v = json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hey"}}]
        });
        assert_eq!(parse_reply(&LlmProvider::OpenAI, &v).unwrap(), "Hey");
    }

    #[test]
    fn parse_relay_reply() {
        let v = json!({"text": "relayed"});
        assert_eq!(parse_reply(&LlmProvider::Relay, &v).unwrap(), "relayed");
    }

    #[test]
    fn divergent_shape_is_hard_failure() {
        let v = json!({"candidates": []});
        assert!(matches!(
            parse_reply(&LlmProvider::Gemini, &v),
            Err(ChatError::MalformedResponse { .. })
        ));
        let v = json!({"choices": [{"message": {"content": null}}]});
        assert!(parse_reply(&LlmProvider::OpenAI, &v).is_err());
    }

    #[test]
    fn parse_error_paths() {
        let v = json!({"error": {"message": "API key not valid", "code": 400}});
        assert_eq!(
            parse_error(&LlmProvider::Gemini, &v).as_deref(),
            Some("API key not valid")
        );
        assert_eq!(
            parse_error(&LlmProvider::OpenAI, &v).as_deref(),
            Some("API key not valid")
        );
        let v = json!({"error": "bad key"});
        assert_eq!(parse_error(&LlmProvider::Relay, &v).as_deref(), Some("bad key"));
        assert_eq!(parse_error(&LlmProvider::Relay, &json!({})), None);
    }
}
