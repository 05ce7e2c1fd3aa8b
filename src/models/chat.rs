// src/models/chat.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ConversationId = i32;

/// Who authored a persisted message.
///
/// Stored in the `messages.sender` column as `USER` / `GEMINI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "GEMINI")]
    Gemini,
}

impl Sender {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Sender::User => "USER",
            Sender::Gemini => "GEMINI",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(Sender::User),
            "GEMINI" => Some(Sender::Gemini),
            _ => None,
        }
    }

    /// Role name the Gemini API expects for this sender
    pub fn gemini_role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Gemini => "model",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// One stored chat turn, serialized in the shape the history endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "MessageID")]
    pub message_id: i32,
    #[serde(skip)]
    pub conversation_id: ConversationId,
    #[serde(rename = "Sender")]
    pub sender: Sender,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// A single role/text pair replayed to the model as context
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self {
            sender: message.sender,
            text: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
