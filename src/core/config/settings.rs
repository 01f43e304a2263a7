//! Typed view over the merged configuration document.
//!
//! Every section is optional in YAML; missing keys fall back to the defaults
//! below, which match the hosted deployment (Gemini embeddings, Groq chat,
//! Qdrant index).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::rag::{ChunkingConfig, PromptSettings};
use crate::vector::DEFAULT_COLLECTION;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub chunking: ChunkingConfig,
    pub ingestion: IngestionSettings,
    pub retrieval: RetrievalSettings,
    pub prompt: PromptSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub vector_index: VectorIndexSettings,
    pub history: HistorySettings,
}

impl AppSettings {
    pub fn from_config(config: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(config.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub corpus_root: PathBuf,
    pub batch_size: usize,
    pub concurrency: usize,
    pub extensions: Vec<String>,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            corpus_root: PathBuf::from("textbook/book/docs"),
            batch_size: 10,
            concurrency: 1,
            extensions: vec!["md".to_string(), "mdx".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    /// Output dimension; the collection is created with exactly this size.
    pub dimension: usize,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub requests_per_minute: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Gemini,
            model: "text-embedding-004".to_string(),
            dimension: 768,
            base_url: None,
            api_key: None,
            requests_per_minute: Some(1_500),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Any OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorIndexKind {
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    pub provider: VectorIndexKind,
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub timeout_secs: u64,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            provider: VectorIndexKind::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub enabled: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}
