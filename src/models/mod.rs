//! Core data model shared by the session store, the REPL, and the API client.

pub mod requests;
pub mod responses;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on the number of stored chat sessions.
pub const MAX_SESSIONS: usize = 100;

/// Model used for chats that do not override it.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Models offered by the settings command.
pub const AVAILABLE_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro"];

/// Shown in place of the model reply when a turn fails mid-stream.
pub const STREAM_FAILURE_MESSAGE: &str =
    "I'm sorry, an error occurred while processing your request. Please try again shortly.";

/// Returned by the rewrite helper when the call fails; the user's draft is
/// never lost to an error.
pub const REWRITE_FAILURE_MESSAGE: &str = "Error: Could not enhance text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role string in the provider's wire format.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// Inline image attachment, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedImage {
    pub mime_type: String,
    pub data: String,
}

/// A grounding citation attached to a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<AttachedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<GroundingSource>>,
}

impl ChatMessage {
    pub fn user(content: &str, image: Option<AttachedImage>) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            image,
            sources: None,
        }
    }

    /// Empty model message appended when a turn starts; it is patched in
    /// place while the response streams.
    pub fn model_placeholder() -> Self {
        Self {
            role: Role::Model,
            content: String::new(),
            image: None,
            sources: None,
        }
    }

    /// True when the message carries neither text nor an attachment.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.image.is_none()
    }
}

/// One independent conversation thread with its own history and model choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

impl ChatSession {
    pub fn new(model: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            model: model.to_string(),
        }
    }

    /// Short label for the session list, taken from the first user message.
    pub fn title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == Role::User && !m.content.is_empty());
        match first {
            Some(msg) => {
                let mut title: String = msg.content.chars().take(40).collect();
                if msg.content.chars().count() > 40 {
                    title.push('…');
                }
                title
            }
            None => "New chat".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrips_through_json() {
        let msg = ChatMessage {
            role: Role::Model,
            content: "hello".to_string(),
            image: None,
            sources: Some(vec![GroundingSource {
                uri: "https://example.com".to_string(),
                title: "Example".to_string(),
            }]),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"model\""));
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let msg = ChatMessage::user("hi", None);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("image"));
        assert!(!json.contains("sources"));
    }

    #[test]
    fn image_uses_camel_case_on_the_wire() {
        let msg = ChatMessage::user(
            "",
            Some(AttachedImage {
                mime_type: "image/png".to_string(),
                data: "aGk=".to_string(),
            }),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"mimeType\":\"image/png\""));
    }

    #[test]
    fn session_title_prefers_first_user_message() {
        let mut session = ChatSession::new(DEFAULT_MODEL);
        assert_eq!(session.title(), "New chat");
        session.messages.push(ChatMessage::user("what is rust?", None));
        session.messages.push(ChatMessage::model_placeholder());
        assert_eq!(session.title(), "what is rust?");
    }

    #[test]
    fn long_titles_are_truncated() {
        let mut session = ChatSession::new(DEFAULT_MODEL);
        session.messages.push(ChatMessage::user(&"x".repeat(80), None));
        let title = session.title();
        assert_eq!(title.chars().count(), 41);
        assert!(title.ends_with('…'));
    }
}
