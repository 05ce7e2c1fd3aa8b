use crate::AppState;
use axum::{extract::Extension, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn status_routes() -> Router {
    Router::new().route("/api/status", get(api_status))
}

// API Status endpoint
async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = match state.orchestrator.store().ping().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Status check: database unhealthy: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "gemini_model": state.orchestrator.gateway().model_name(),
        },
        "endpoints": {
            "chat": "/api/chat",
            "history": "/api/chat/:conversationId",
            "status": "/api/status"
        }
    }))
}
