use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{check_dimension, http_client, read_json, require_api_key};
use super::{EmbeddingError, EmbeddingGateway, EmbeddingMode};
use crate::core::config::EmbeddingSettings;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Generative Language embeddings (`text-embedding-004` by default).
#[derive(Clone)]
pub struct GeminiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.trim_start_matches("models/").to_string(),
            api_key: require_api_key(settings)?,
            dimension: settings.dimension,
            client: http_client(settings.timeout_secs)?,
        })
    }

    fn request_body(&self, text: &str, mode: EmbeddingMode) -> Value {
        json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type(mode),
            "outputDimensionality": self.dimension,
        })
    }
}

fn task_type(mode: EmbeddingMode) -> &'static str {
    match mode {
        EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingMode::Query => "RETRIEVAL_QUERY",
    }
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[async_trait]
impl EmbeddingGateway for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(text, mode))
            .send()
            .await
            .map_err(EmbeddingError::Transport)?;

        let payload: EmbedContentResponse = read_json(res).await?;
        check_dimension(payload.embedding.values, self.dimension)
    }

    async fn embed_many(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| self.request_body(text, mode))
            .collect();
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(EmbeddingError::Transport)?;

        let payload: BatchEmbedContentsResponse = read_json(res).await?;
        if payload.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }

        payload
            .embeddings
            .into_iter()
            .map(|embedding| check_dimension(embedding.values, self.dimension))
            .collect()
    }
}
