use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::math::{cosine_similarity, descending, dot_product, euclidean_distance};
use super::{Distance, IndexError, Point, ScoredPayload, VectorIndex};

struct Collection {
    dimension: usize,
    distance: Distance,
    points: BTreeMap<u64, Point>,
}

/// Process-local index with exhaustive search.
pub struct InMemoryVectorIndex {
    name: String,
    inner: RwLock<Option<Collection>>,
}

impl InMemoryVectorIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(None),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new(super::DEFAULT_COLLECTION)
    }
}

fn score(distance: Distance, query: &[f32], candidate: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(query, candidate),
        Distance::Dot => dot_product(query, candidate),
        Distance::Euclid => -euclidean_distance(query, candidate),
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn collection(&self) -> &str {
        &self.name
    }

    async fn recreate_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), IndexError> {
        let mut guard = self.inner.write().await;
        *guard = Some(Collection {
            dimension,
            distance,
            points: BTreeMap::new(),
        });
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError> {
        let mut guard = self.inner.write().await;
        let collection = guard
            .as_mut()
            .ok_or_else(|| IndexError::MissingCollection(self.name.clone()))?;

        // Reject the whole batch before touching stored points.
        if let Some(bad) = points
            .iter()
            .find(|point| point.vector.len() != collection.dimension)
        {
            return Err(IndexError::DimensionMismatch {
                expected: collection.dimension,
                actual: bad.vector.len(),
            });
        }

        for point in points {
            collection.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPayload>, IndexError> {
        let guard = self.inner.read().await;
        let Some(collection) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        if vector.len() != collection.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: collection.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<ScoredPayload> = collection
            .points
            .values()
            .map(|point| ScoredPayload {
                id: point.id,
                score: score(collection.distance, vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();
        scored.sort_by(|a, b| descending(a.score, b.score).then(a.id.cmp(&b.id)));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let guard = self.inner.read().await;
        Ok(guard.as_ref().map(|c| c.points.len()).unwrap_or(0))
    }
}
