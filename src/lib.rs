// lib.rs - Chat relay between a chat client, PostgreSQL history and Gemini
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod gemini_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod orchestrator;
pub mod store;

use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

pub use error::ChatError;
pub use orchestrator::ChatOrchestrator;

// AppState holds the orchestrator, which owns the store (and through it the pool) and the Gemini gateway
pub struct AppState {
    pub orchestrator: ChatOrchestrator,
}

/// Build the HTTP application with all routes and shared state
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::chat::chat_routes())
        .merge(handlers::status::status_routes())
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
