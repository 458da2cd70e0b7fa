//! API routes for the RAG server

pub mod chat;

use axum::{
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(chat::health))
        .route("/chat", post(chat::chat))
        .route("/retrieve", post(chat::retrieve))
        .route("/query-without-rag", post(chat::query_without_rag))
}
