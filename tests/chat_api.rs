//! Drives the HTTP routes end to end with in-memory storage and a canned model.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use gemini_chat::gemini_client::{GatewayError, ModelGateway};
use gemini_chat::models::chat::{ConversationId, Message, Sender, Turn};
use gemini_chat::store::{ConversationStore, StoreError};
use gemini_chat::{app, AppState, ChatOrchestrator};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct InMemoryStore {
    next_conversation: Mutex<ConversationId>,
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(&self) -> Result<ConversationId, StoreError> {
        let mut next = self.next_conversation.lock().unwrap();
        *next += 1;
        Ok(*next)
    }

    async fn conversation_exists(&self, id: ConversationId) -> Result<bool, StoreError> {
        Ok(id >= 1 && id <= *self.next_conversation.lock().unwrap())
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let message = Message {
            message_id: messages.len() as i32 + 1,
            conversation_id,
            sender,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct CannedGateway {
    fail: bool,
}

#[async_trait]
impl ModelGateway for CannedGateway {
    async fn generate_reply(&self, history: &[Turn], message: &str) -> Result<String, GatewayError> {
        if self.fail {
            return Err(GatewayError::Api {
                status: 401,
                body: "API key not valid".to_string(),
            });
        }
        Ok(format!("reply #{} to {}", history.len() / 2 + 1, message))
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

fn router(fail: bool) -> (axum::Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let orchestrator = ChatOrchestrator::new(store.clone(), Arc::new(CannedGateway { fail }));
    (app(Arc::new(AppState { orchestrator })), store)
}

async fn post_chat(app: &axum::Router, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn get_history(app: &axum::Router, id: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(format!("/api/chat/{id}"))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn hello_starts_a_fresh_conversation() {
    let (app, _) = router(false);

    let (status, json) = post_chat(&app, json!({ "message": "hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["conversationId"].is_i64());
    assert!(!json["response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_conversation_gets_a_new_id() {
    let (app, _) = router(false);

    let (status, json) = post_chat(&app, json!({ "message": "hi", "conversationId": 7 })).await;

    assert_eq!(status, StatusCode::OK);
    assert_ne!(json["conversationId"], 7);
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let (app, store) = router(false);

    let (status, json) = post_chat(&app, json!({ "message": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Message content is required.");

    let (status, _) = post_chat(&app, json!({ "conversationId": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(store.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let (app, _) = router(false);
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn history_of_empty_conversation_is_empty_list() {
    let (app, _) = router(false);

    let (status, json) = get_history(&app, "999").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn history_lists_every_turn_in_order() {
    let (app, _) = router(false);

    let (_, first) = post_chat(&app, json!({ "message": "one" })).await;
    let id = first["conversationId"].as_i64().unwrap();
    for text in ["two", "three"] {
        let (_, json) = post_chat(&app, json!({ "message": text, "conversationId": id })).await;
        assert_eq!(json["conversationId"], id);
    }

    let (status, json) = get_history(&app, &id.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 6);
    let senders: Vec<_> = rows.iter().map(|r| r["Sender"].as_str().unwrap()).collect();
    assert_eq!(senders, vec!["USER", "GEMINI", "USER", "GEMINI", "USER", "GEMINI"]);
    assert_eq!(rows[4]["Content"], "three");
    assert_eq!(rows[5]["Content"], "reply #3 to three");
    assert!(rows.iter().all(|r| r["MessageID"].is_i64() && r["Timestamp"].is_string()));
}

#[tokio::test]
async fn gateway_failure_is_500_without_details() {
    let (app, store) = router(true);

    let (status, json) = post_chat(&app, json!({ "message": "hello" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].is_string());
    assert!(json.get("details").is_none());
    assert!(!json.to_string().contains("API key"));

    // the prompt stays stored, no reply is written
    let messages = store.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::User);
}

#[tokio::test]
async fn non_numeric_history_id_is_rejected() {
    let (app, _) = router(false);

    let (status, _) = get_history(&app, "abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_services() {
    let (app, _) = router(false);
    let req = Request::builder().uri("/api/status").body(Body::empty()).unwrap();

    let (status, json) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["services"]["database"], "healthy");
    assert_eq!(json["services"]["gemini_model"], "canned");
}
