use crate::models::chat::{ChatReply, ChatRequest, ConversationId, ErrorBody, Message};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Server { status: u16, message: Option<String> },
}

impl ClientError {
    /// The `error` field of a non-2xx response body, when the server sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// What the chat client needs from the server.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;

    async fn fetch_history(&self, conversation_id: ConversationId) -> Result<Vec<Message>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
}

impl HttpChatApi {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error)
            .filter(|error| !error.is_empty());
        ClientError::Server { status, message }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json().await?)
    }

    async fn fetch_history(&self, conversation_id: ConversationId) -> Result<Vec<Message>, ClientError> {
        let response = self
            .client
            .get(format!("{}/chat/{}", self.base_url, conversation_id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn serve(router: Router) -> HttpChatApi {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpChatApi::new(format!("http://{addr}/api/"))
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: Some(message.to_string()),
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn test_send_message_returns_reply() {
        let api = serve(Router::new().route(
            "/api/chat",
            post(|Json(req): Json<ChatRequest>| async move {
                Json(json!({
                    "response": format!("echo {}", req.message.unwrap_or_default()),
                    "conversationId": 4
                }))
            }),
        ))
        .await;

        let reply = api.send_message(&request("hi")).await.unwrap();
        assert_eq!(reply.response, "echo hi");
        assert_eq!(reply.conversation_id, 4);
    }

    #[tokio::test]
    async fn test_server_error_body_is_surfaced() {
        let api = serve(Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An error occurred while processing your request." })),
                )
            }),
        ))
        .await;

        let err = api.send_message(&request("hi")).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert_eq!(
            err.server_message(),
            Some("An error occurred while processing your request.")
        );
    }

    #[tokio::test]
    async fn test_plain_text_rejection_has_no_message() {
        let api = serve(Router::new().route(
            "/api/chat/:id",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain")],
                    "Invalid URL: Cannot parse `abc` to a `i32`",
                )
            }),
        ))
        .await;

        let err = api.fetch_history(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 400, .. }));
        assert_eq!(err.server_message(), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let api = HttpChatApi::new("http://127.0.0.1:1/api");

        let err = api.fetch_history(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert_eq!(err.server_message(), None);
    }
}
