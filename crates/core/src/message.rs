//! Conversation and message domain types.
//!
//! A `Conversation` groups the durable chat history; each `StoredMessage`
//! belongs to exactly one conversation and carries a user or assistant role.
//! `ChatMessage` is the transient role/content pair shipped to the completion
//! provider — it is assembled fresh per request and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to conversations at creation.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// The wire string used in provider payloads and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A conversation: a titled container for an ordered message history.
///
/// `updated_at` is bumped whenever a new exchange completes, so listing
/// conversations newest-activity-first is a sort on this column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation ID
    #[serde(rename = "_id")]
    pub id: String,

    /// Display title (defaults to a placeholder)
    pub title: String,

    /// Last-activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation with the placeholder title.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_CONVERSATION_TITLE.into(),
            updated_at: Utc::now(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// A single durable message in a conversation's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Unique message ID
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning conversation
    pub conversation_id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp — insertion order defines conversational order
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(conversation_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A role/content pair as sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

impl From<&StoredMessage> for ChatMessage {
    /// History messages keep their role and content only; ids and
    /// timestamps never reach the provider.
    fn from(m: &StoredMessage) -> Self {
        Self {
            role: m.role.as_str().into(),
            content: m.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn new_conversation_has_placeholder_title() {
        let conv = Conversation::new();
        assert_eq!(conv.title, "New Conversation");
        assert!(!conv.id.is_empty());
    }

    #[test]
    fn conversation_serializes_mongo_style_id() {
        let conv = Conversation::new();
        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["title"], "New Conversation");
    }

    #[test]
    fn role_round_trip() {
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert!(Role::from_str("system").is_err());
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn stored_message_serialization() {
        let msg = StoredMessage::new("conv-1", Role::User, "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["conversationId"], "conv-1");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn chat_message_drops_everything_but_role_and_content() {
        let stored = StoredMessage::new("conv-1", Role::Assistant, "reply text");
        let wire = ChatMessage::from(&stored);
        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.content, "reply text");
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
