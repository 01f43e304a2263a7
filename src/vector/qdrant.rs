use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Distance, IndexError, Payload, Point, ScoredPayload, VectorIndex};
use crate::core::config::VectorIndexSettings;

/// Qdrant over its REST API.
#[derive(Clone)]
pub struct QdrantIndex {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    #[serde(default)]
    points_count: Option<u64>,
}

impl QdrantIndex {
    pub fn new(settings: &VectorIndexSettings) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(IndexError::Transport)?;
        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, IndexError> {
        self.authorize(request)
            .send()
            .await
            .map_err(IndexError::Transport)
    }
}

async fn unexpected(res: Response) -> IndexError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    IndexError::Unexpected { status, body }
}

async fn ensure_success(res: Response) -> Result<(), IndexError> {
    if res.status().is_success() {
        Ok(())
    } else {
        Err(unexpected(res).await)
    }
}

fn hit_to_payload(hit: SearchHit) -> Result<ScoredPayload, IndexError> {
    let id = hit
        .id
        .as_u64()
        .ok_or_else(|| IndexError::Malformed(format!("non-numeric point id {}", hit.id)))?;
    let text = hit
        .payload
        .as_ref()
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| IndexError::Malformed(format!("point {} has no text payload", id)))?
        .to_string();
    Ok(ScoredPayload {
        id,
        score: hit.score,
        payload: Payload { text },
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn recreate_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), IndexError> {
        let url = self.collection_url();

        let res = self.send(self.client.delete(&url)).await?;
        if res.status() != StatusCode::NOT_FOUND {
            ensure_success(res).await?;
        }

        let body = json!({
            "vectors": { "size": dimension, "distance": distance.as_str() }
        });
        let res = self.send(self.client.put(&url).json(&body)).await?;
        ensure_success(res).await?;

        tracing::info!(
            "Recreated collection '{}' (size={}, distance={})",
            self.collection,
            dimension,
            distance.as_str()
        );
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError> {
        if points.is_empty() {
            return Ok(());
        }

        let url = format!("{}/points?wait=true", self.collection_url());
        let body = json!({ "points": points });
        let res = self.send(self.client.put(&url).json(&body)).await?;
        match res.status() {
            StatusCode::NOT_FOUND => Err(IndexError::MissingCollection(self.collection.clone())),
            status if status.is_success() => Ok(()),
            _ => Err(unexpected(res).await),
        }
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPayload>, IndexError> {
        let url = format!("{}/points/search", self.collection_url());
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let res = self.send(self.client.post(&url).json(&body)).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !res.status().is_success() {
            return Err(unexpected(res).await);
        }

        let payload: QdrantResponse<Vec<SearchHit>> = res
            .json()
            .await
            .map_err(|e| IndexError::Malformed(e.to_string()))?;
        payload.result.into_iter().map(hit_to_payload).collect()
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let res = self.send(self.client.get(self.collection_url())).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !res.status().is_success() {
            return Err(unexpected(res).await);
        }

        let payload: QdrantResponse<CollectionInfo> = res
            .json()
            .await
            .map_err(|e| IndexError::Malformed(e.to_string()))?;
        Ok(payload.result.points_count.unwrap_or(0) as usize)
    }
}
