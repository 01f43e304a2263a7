//! Embedding gateway.
//!
//! Converts text into fixed-length vectors through a remote provider. The
//! two [`EmbeddingMode`]s only change the provider's task hint; both produce
//! vectors of the same dimension in the same space.

mod gemini;
mod limiter;
mod openai;

pub use gemini::GeminiEmbedder;
pub use limiter::RateLimitedEmbedder;
pub use openai::OpenAiEmbedder;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{EmbeddingProviderKind, EmbeddingSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingMode {
    /// Passages being indexed.
    Document,
    /// User questions being matched against indexed passages.
    Query,
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("embedding provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding provider is not configured: {0}")]
    NotConfigured(String),
}

impl EmbeddingError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, EmbeddingError::Provider { status: 429, .. })
    }
}

#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Provider name for logs (e.g. "gemini", "openai").
    fn name(&self) -> &str;

    /// Length of every vector this gateway returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds `texts` preserving order. Providers with a native batch
    /// endpoint override this; the default maps `embed` over the inputs.
    async fn embed_many(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text, mode).await?);
        }
        Ok(vectors)
    }
}

/// Builds the configured provider, wrapped in a rate limiter when
/// `requests_per_minute` is set.
pub fn from_settings(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingGateway>, EmbeddingError> {
    let gateway: Arc<dyn EmbeddingGateway> = match settings.provider {
        EmbeddingProviderKind::Gemini => Arc::new(GeminiEmbedder::new(settings)?),
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbedder::new(settings)?),
    };

    match settings.requests_per_minute {
        Some(rpm) => Ok(Arc::new(RateLimitedEmbedder::per_minute(gateway, rpm))),
        None => Ok(gateway),
    }
}

fn http_client(timeout_secs: u64) -> Result<Client, EmbeddingError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(EmbeddingError::Transport)
}

fn require_api_key(settings: &EmbeddingSettings) -> Result<String, EmbeddingError> {
    settings
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| EmbeddingError::NotConfigured("embedding.api_key is missing".to_string()))
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, EmbeddingError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(EmbeddingError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| EmbeddingError::Malformed(e.to_string()))
}

pub(crate) fn check_dimension(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}
