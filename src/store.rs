// src/store.rs
//! Conversation and message persistence.

use crate::models::chat::{ConversationId, Message, Sender};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Conversation {0} does not exist")]
    UnknownConversation(ConversationId),
    #[error("Message {message_id} has unrecognised sender '{sender}'")]
    CorruptRow { message_id: i32, sender: String },
}

/// Durable chat history. Every call goes to storage; nothing is cached.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self) -> Result<ConversationId, StoreError>;

    async fn conversation_exists(&self, id: ConversationId) -> Result<bool, StoreError>;

    /// Insert one message with a server-assigned timestamp and return the stored row.
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// All messages of a conversation, oldest first. Empty when there are none.
    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

type MessageRow = (i32, ConversationId, String, String, DateTime<Utc>);

fn message_from_row(
    (message_id, conversation_id, sender, content, timestamp): MessageRow,
) -> Result<Message, StoreError> {
    let sender = Sender::from_db_str(&sender)
        .ok_or(StoreError::CorruptRow { message_id, sender })?;

    Ok(Message {
        message_id,
        conversation_id,
        sender,
        content,
        timestamp,
    })
}

// Postgres error code for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION),
        _ => false,
    }
}

pub struct PgConversationStore {
    db_pool: PgPool,
}

impl PgConversationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn create_conversation(&self) -> Result<ConversationId, StoreError> {
        let id = sqlx::query_scalar::<_, ConversationId>(
            "INSERT INTO conversations DEFAULT VALUES RETURNING conversation_id",
        )
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!("New conversation started: ID {}", id);
        Ok(id)
    }

    async fn conversation_exists(&self, id: ConversationId) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE conversation_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(exists)
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (conversation_id, sender, content)
            VALUES ($1, $2, $3)
            RETURNING message_id, conversation_id, sender, content, "timestamp"
            "#,
        )
        .bind(conversation_id)
        .bind(sender.as_db_str())
        .bind(content)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::UnknownConversation(conversation_id)
            } else {
                StoreError::Database(e)
            }
        })?;

        tracing::debug!(
            "Message saved: [ConvID: {}, Sender: {}, len: {}]",
            conversation_id,
            sender,
            content.len()
        );
        message_from_row(row)
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT message_id, conversation_id, sender, content, "timestamp"
            FROM messages
            WHERE conversation_id = $1
            ORDER BY "timestamp" ASC, message_id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
