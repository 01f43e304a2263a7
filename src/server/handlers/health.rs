use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the textbook RAG chatbot API" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // An unreachable index is reported, not raised; answering still works.
    let points = match state.index.count().await {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!("Health check could not count points: {}", err);
            None
        }
    };
    Json(json!({
        "status": "ok",
        "collection": state.index.collection(),
        "indexed_points": points,
        "history_enabled": state.history.is_some()
    }))
}
