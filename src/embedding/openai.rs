use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{check_dimension, http_client, read_json, require_api_key};
use super::{EmbeddingError, EmbeddingGateway, EmbeddingMode};
use crate::core::config::EmbeddingSettings;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible `/embeddings` endpoint. The API has no task hint, so
/// both modes send the same request.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: require_api_key(settings)?,
            dimension: settings.dimension,
            client: http_client(settings.timeout_secs)?,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

/// Items may come back in any order; `index` ties each one to its input.
fn order_by_index(
    mut items: Vec<EmbeddingItem>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if items.len() != expected {
        return Err(EmbeddingError::Malformed(format!(
            "requested {} embeddings, received {}",
            expected,
            items.len()
        )));
    }
    items.sort_by_key(|item| item.index);
    if items.iter().enumerate().any(|(pos, item)| pos != item.index) {
        return Err(EmbeddingError::Malformed(
            "embedding indices do not match inputs".to_string(),
        ));
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl EmbeddingGateway for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_many(&[text.to_string()], mode).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("empty embedding response".to_string()))
    }

    async fn embed_many(
        &self,
        texts: &[String],
        _mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": texts,
            "dimensions": self.dimension,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(EmbeddingError::Transport)?;

        let payload: EmbeddingsResponse = read_json(res).await?;
        order_by_index(payload.data, texts.len())?
            .into_iter()
            .map(|vector| check_dimension(vector, self.dimension))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_index_restores_input_order() {
        let items = vec![
            EmbeddingItem { index: 1, embedding: vec![2.0] },
            EmbeddingItem { index: 0, embedding: vec![1.0] },
        ];
        let vectors = order_by_index(items, 2).expect("ordered");
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn order_by_index_rejects_short_or_gapped_responses() {
        let short = vec![EmbeddingItem { index: 0, embedding: vec![1.0] }];
        assert!(matches!(
            order_by_index(short, 2),
            Err(EmbeddingError::Malformed(_))
        ));

        let gapped = vec![
            EmbeddingItem { index: 0, embedding: vec![1.0] },
            EmbeddingItem { index: 2, embedding: vec![3.0] },
        ];
        assert!(order_by_index(gapped, 2).is_err());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let settings = EmbeddingSettings {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:1234/v1/".to_string()),
            ..EmbeddingSettings::default()
        };
        let embedder = OpenAiEmbedder::new(&settings).expect("embedder");
        assert_eq!(embedder.base_url, "http://localhost:1234/v1");
        assert_eq!(embedder.name(), "openai");
    }
}
