//! View state of the chat client.
//!
//! Everything here runs on the UI's own loop: one request in flight at most,
//! optimistic rendering of the user's message, and an inline error entry when
//! the server call fails.

use super::api::{ChatApi, ClientError};
use super::storage::SessionStorage;
use crate::models::chat::{ChatReply, ChatRequest, ConversationId, Message, Sender};
use chrono::{DateTime, Utc};

pub const SEND_FAILED: &str = "Failed to get response from Gemini.";
pub const LOAD_FAILED: &str = "Failed to load chat history.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Sending,
    ErrorShown,
}

/// Author of a rendered entry. `Error` entries exist only on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Gemini,
    Error,
}

impl From<Sender> for EntryRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => EntryRole::User,
            Sender::Gemini => EntryRole::Gemini,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryId {
    /// Assigned locally before (or instead of) the server storing the message
    Temporary(u64),
    Stored(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: EntryId,
    pub role: EntryRole,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<Message> for ChatEntry {
    fn from(message: Message) -> Self {
        Self {
            id: EntryId::Stored(message.message_id),
            role: message.sender.into(),
            text: message.content,
            timestamp: Some(message.timestamp),
        }
    }
}

pub struct ChatSession<S: SessionStorage> {
    entries: Vec<ChatEntry>,
    status: Status,
    conversation_id: Option<ConversationId>,
    banner: Option<String>,
    storage: S,
    next_temp_id: u64,
}

impl<S: SessionStorage> ChatSession<S> {
    pub fn new(storage: S) -> Self {
        Self {
            entries: Vec::new(),
            status: Status::Idle,
            conversation_id: None,
            banner: None,
            storage,
            next_temp_id: 1,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    /// Error banner text, if one is showing
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Load the remembered conversation, if any, before input is accepted.
    pub async fn restore<A: ChatApi + ?Sized>(&mut self, api: &A) {
        let Some(id) = self.storage.load() else {
            return;
        };

        self.status = Status::Sending;
        match api.fetch_history(id).await {
            Ok(messages) => {
                self.entries = messages.into_iter().map(ChatEntry::from).collect();
                self.conversation_id = Some(id);
                self.status = Status::Idle;
            }
            Err(e) => {
                tracing::warn!("Error loading chat history for {}: {}", id, e);
                self.entries.clear();
                self.conversation_id = None;
                self.banner = Some(LOAD_FAILED.to_string());
                self.status = Status::ErrorShown;
            }
        }
    }

    /// Start a send: render the user's text right away and hand back the request to issue.
    ///
    /// Returns `None` for blank input or while a request is already in flight.
    pub fn begin_send(&mut self, input: &str) -> Option<ChatRequest> {
        if input.trim().is_empty() || self.status == Status::Sending {
            return None;
        }

        let id = self.temp_id();
        self.entries.push(ChatEntry {
            id,
            role: EntryRole::User,
            text: input.to_string(),
            timestamp: Some(Utc::now()),
        });
        self.banner = None;
        self.status = Status::Sending;

        Some(ChatRequest {
            message: Some(input.to_string()),
            conversation_id: self.conversation_id,
        })
    }

    /// Finish the in-flight send with the server's answer.
    pub fn complete_send(&mut self, result: Result<ChatReply, ClientError>) {
        match result {
            Ok(reply) => {
                let id = self.temp_id();
                self.entries.push(ChatEntry {
                    id,
                    role: EntryRole::Gemini,
                    text: reply.response,
                    timestamp: Some(Utc::now()),
                });
                if self.conversation_id != Some(reply.conversation_id) {
                    self.conversation_id = Some(reply.conversation_id);
                    if let Err(e) = self.storage.save(reply.conversation_id) {
                        tracing::warn!("Could not remember conversation {}: {}", reply.conversation_id, e);
                    }
                }
                self.status = Status::Idle;
            }
            Err(e) => {
                tracing::warn!("Error sending message: {}", e);
                let error_text = e.server_message().unwrap_or(SEND_FAILED).to_string();
                let id = self.temp_id();
                self.entries.push(ChatEntry {
                    id,
                    role: EntryRole::Error,
                    text: format!("Error: {error_text}"),
                    timestamp: None,
                });
                self.banner = Some(error_text);
                self.status = Status::ErrorShown;
            }
        }
    }

    /// `begin_send`, the HTTP call and `complete_send` in one step. Returns whether anything was sent.
    pub async fn send<A: ChatApi + ?Sized>(&mut self, api: &A, input: &str) -> bool {
        let Some(request) = self.begin_send(input) else {
            return false;
        };
        let result = api.send_message(&request).await;
        self.complete_send(result);
        true
    }

    /// Forget the local transcript and conversation. Nothing is deleted on the server.
    pub fn new_chat(&mut self) {
        self.entries.clear();
        self.conversation_id = None;
        self.banner = None;
        self.status = Status::Idle;
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Could not clear remembered conversation: {}", e);
        }
    }

    fn temp_id(&mut self) -> EntryId {
        let id = EntryId::Temporary(self.next_temp_id);
        self.next_temp_id += 1;
        id
    }
}
