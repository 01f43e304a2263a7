//! Vector index abstraction.
//!
//! A single named collection of `(id, vector, payload)` points with a fixed
//! dimension and distance metric. `QdrantIndex` is the production backend;
//! `InMemoryVectorIndex` backs local runs and tests.

pub mod math;
mod memory;
mod qdrant;

pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantIndex;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{VectorIndexKind, VectorIndexSettings};

pub const DEFAULT_COLLECTION: &str = "textbook_content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    /// Name used by the Qdrant API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// The chunk text returned to the answer pipeline.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPayload {
    pub id: u64,
    /// Higher is more similar, whatever the metric.
    pub score: f32,
    pub payload: Payload,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("vector index returned {status}: {body}")]
    Unexpected { status: u16, body: String },
    #[error("malformed vector index response: {0}")]
    Malformed(String),
    #[error("vector has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("collection '{0}' does not exist")]
    MissingCollection(String),
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn collection(&self) -> &str;

    /// Drops the collection if it exists and creates it empty. Dropping a
    /// missing collection is not an error.
    async fn recreate_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), IndexError>;

    /// Inserts or replaces points by id. Waits until the write is visible to
    /// subsequent searches.
    async fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError>;

    /// Returns at most `top_k` payloads, best first. A missing collection
    /// yields an empty result.
    async fn search(&self, vector: &[f32], top_k: usize)
        -> Result<Vec<ScoredPayload>, IndexError>;

    /// Number of stored points; 0 when the collection is missing.
    async fn count(&self) -> Result<usize, IndexError>;
}

pub fn from_settings(settings: &VectorIndexSettings) -> Result<Arc<dyn VectorIndex>, IndexError> {
    match settings.provider {
        VectorIndexKind::Qdrant => Ok(Arc::new(QdrantIndex::new(settings)?)),
        VectorIndexKind::Memory => Ok(Arc::new(InMemoryVectorIndex::new(
            settings.collection.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_builds_named_collection() {
        let settings = VectorIndexSettings {
            provider: VectorIndexKind::Memory,
            collection: "scratch".to_string(),
            ..VectorIndexSettings::default()
        };
        let index = from_settings(&settings).expect("index");
        assert_eq!(index.collection(), "scratch");
    }

    #[test]
    fn default_settings_target_textbook_collection() {
        let index = from_settings(&VectorIndexSettings::default()).expect("qdrant index");
        assert_eq!(index.collection(), DEFAULT_COLLECTION);
    }
}
