// src/orchestrator.rs
//! Per-request sequencing of store writes and the model call.
//!
//! A chat turn is best-effort, not atomic: the user's message is stored before
//! the model is called and stays stored if the call fails, and a reply that
//! cannot be stored is still returned to the caller.

use crate::error::ChatError;
use crate::gemini_client::ModelGateway;
use crate::models::chat::{ChatReply, ChatRequest, ConversationId, Message, Sender, Turn};
use crate::store::ConversationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const EMPTY_MESSAGE_ERROR: &str = "Message content is required.";

/// One async mutex per conversation so turns on the same thread of history
/// never interleave their reads and writes.
#[derive(Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    pub async fn acquire(&self, id: ConversationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct ChatOrchestrator {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn ModelGateway>,
    locks: ConversationLocks,
}

impl ChatOrchestrator {
    pub fn new(store: Arc<dyn ConversationStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            store,
            gateway,
            locks: ConversationLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    /// Run one chat turn: store the prompt, ask the model with full history, store the reply.
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let message = match request.message {
            Some(message) if !message.trim().is_empty() => message,
            _ => return Err(ChatError::Validation(EMPTY_MESSAGE_ERROR.to_string())),
        };

        let conversation_id = self.resolve_conversation(request.conversation_id).await?;
        let _guard = self.locks.acquire(conversation_id).await;

        let prompt = self
            .store
            .append_message(conversation_id, Sender::User, &message)
            .await?;

        let history = self.store.list_messages(conversation_id).await?;
        let context = prior_turns(&history, &prompt);

        tracing::info!(
            "Sending request to Gemini for ConvID: {} ({} prior turns)",
            conversation_id,
            context.len()
        );
        let reply = self
            .gateway
            .generate_reply(&context, &message)
            .await
            .map_err(|e| {
                tracing::debug!("Gemini call failed for ConvID {}: {}", conversation_id, e);
                ChatError::Gateway(e)
            })?;

        if let Err(e) = self
            .store
            .append_message(conversation_id, Sender::Gemini, &reply)
            .await
        {
            tracing::error!(
                "Failed to save Gemini reply for ConvID {} (returning it anyway): {}",
                conversation_id,
                e
            );
        }

        Ok(ChatReply {
            response: reply,
            conversation_id,
        })
    }

    /// Full ordered history of a conversation; empty for unknown ids.
    pub async fn history(&self, conversation_id: ConversationId) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.list_messages(conversation_id).await?)
    }

    async fn resolve_conversation(
        &self,
        requested: Option<ConversationId>,
    ) -> Result<ConversationId, ChatError> {
        if let Some(id) = requested {
            if self.store.conversation_exists(id).await? {
                return Ok(id);
            }
            tracing::warn!("Conversation ID {} not found. Starting new one.", id);
        }

        Ok(self.store.create_conversation().await?)
    }
}

// The stored prompt is sent separately as the new message, so leave it out of the context
fn prior_turns(history: &[Message], prompt: &Message) -> Vec<Turn> {
    history
        .iter()
        .filter(|m| m.message_id != prompt.message_id)
        .map(Turn::from)
        .collect()
}
