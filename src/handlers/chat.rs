// src/handlers/chat.rs
use crate::error::{ChatError, WithMessage};
use crate::models::chat::{ChatReply, ChatRequest, ConversationId, Message};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub const HISTORY_ERROR: &str = "Failed to fetch chat history.";

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/:conversation_id", get(get_chat_history))
}

/// Start a new chat or continue an existing one
async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected chat body: {}", rejection);
        ChatError::Validation(rejection.body_text())
    })?;

    let reply = state.orchestrator.handle_chat(request).await?;
    Ok(Json(reply))
}

async fn get_chat_history(
    Path(conversation_id): Path<ConversationId>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Message>>, WithMessage> {
    tracing::debug!("Fetching conversation history for conversation: {}", conversation_id);

    let messages = state
        .orchestrator
        .history(conversation_id)
        .await
        .map_err(|error| WithMessage {
            error,
            message: HISTORY_ERROR,
        })?;

    tracing::info!(
        "Found {} messages for conversation {}",
        messages.len(),
        conversation_id
    );
    Ok(Json(messages))
}
