use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestRequest {
    /// Overrides `ingestion.corpus_root` for this run. Must stay inside the
    /// project root.
    #[serde(default)]
    pub corpus_root: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub chunks: usize,
    pub documents: usize,
    pub generation: Uuid,
}

/// An empty body means "use the configured corpus". Anything else must parse,
/// since a run drops the live collection before rebuilding it.
fn parse_request(body: &[u8]) -> Result<IngestRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IngestRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid ingest request: {}", e)))
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let request = parse_request(&body)?;
    let root = match request.corpus_root {
        Some(path) => state.paths.resolve_within_project(&path).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "corpus_root {} is outside the project root",
                path.display()
            ))
        })?,
        None => state.corpus_root(),
    };

    let report = state.ingestion.ingest_with_report(&root).await?;

    Ok(Json(IngestResponse {
        message: format!(
            "Successfully ingested {} chunks into collection '{}'.",
            report.chunks,
            state.index.collection()
        ),
        chunks: report.chunks,
        documents: report.documents,
        generation: report.generation,
    }))
}
