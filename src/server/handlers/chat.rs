use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::Answer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryContextRequest {
    pub query: String,
    pub context: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub grounding: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let query = require_query(&payload.query)?;
    let answer = state.answers.answer(query, None).await;
    Ok(Json(respond(&state, query, answer).await))
}

pub async fn query_context(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryContextRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let query = require_query(&payload.query)?;
    let answer = state
        .answers
        .answer(query, Some(payload.context.as_str()))
        .await;
    Ok(Json(respond(&state, query, answer).await))
}

fn require_query(raw: &str) -> Result<&str, ApiError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query cannot be empty".to_string()));
    }
    Ok(query)
}

/// Stores the exchange when history is enabled. Storage failures are logged
/// and never change the reply.
async fn respond(state: &AppState, query: &str, answer: Answer) -> QueryResponse {
    let grounding = answer.grounding_label().to_string();
    let response = answer.into_text();

    if let Some(history) = &state.history {
        if let Err(err) = history.record(query, &response, &grounding).await {
            tracing::warn!("Failed to record chat history: {}", err);
        }
    }

    QueryResponse {
        response,
        grounding,
    }
}
