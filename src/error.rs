//! Request-level error taxonomy and its HTTP mapping.

use crate::gemini_client::GatewayError;
use crate::models::chat::ErrorBody;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use thiserror::Error;
use uuid::Uuid;

pub const GENERIC_CHAT_ERROR: &str = "An error occurred while processing your request.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ChatError::Validation(m) => m.clone(),
            _ => {
                // Detail stays in the server log only
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = %error_id, error = %self, "chat request failed");
                GENERIC_CHAT_ERROR.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Turns a handler panic into the generic 500 instead of a dropped connection.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ChatError::Internal(detail).into_response()
}

/// Wraps a [`ChatError`] for endpoints that answer failures with a fixed message.
#[derive(Debug)]
pub struct WithMessage {
    pub error: ChatError,
    pub message: &'static str,
}

impl IntoResponse for WithMessage {
    fn into_response(self) -> Response {
        if matches!(self.error, ChatError::Validation(_)) {
            return self.error.into_response();
        }

        tracing::error!(error = %self.error, "{}", self.message);
        (
            self.error.status_code(),
            Json(ErrorBody {
                error: self.message.to_string(),
            }),
        )
            .into_response()
    }
}
