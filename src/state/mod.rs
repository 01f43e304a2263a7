use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::embedding::{self, EmbeddingGateway};
use crate::history::ChatHistoryStore;
use crate::llm::{self, GenerationGateway};
use crate::rag::{AnswerPipeline, IngestionConfig, IngestionPipeline, PromptBuilder};
use crate::vector::{self, VectorIndex};

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// The pipelines hold the provider clients; `index` is kept here as well so
/// the health route can report the collection size.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppSettings>,
    pub answers: Arc<AnswerPipeline>,
    pub ingestion: Arc<IngestionPipeline>,
    pub index: Arc<dyn VectorIndex>,
    pub history: Option<ChatHistoryStore>,
}

impl AppState {
    /// Loads configuration, builds the provider clients and opens the
    /// history database.
    pub async fn initialize_with_paths(
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let raw = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::info!(
            "Effective configuration: {}",
            config.redact_sensitive_values(&raw)
        );
        let settings = AppSettings::from_config(&raw)
            .map_err(|e| InitializationError::Config(e.into()))?;

        let embedder = embedding::from_settings(&settings.embedding)
            .map_err(|e| InitializationError::Embedding(e.into()))?;
        let index = vector::from_settings(&settings.vector_index)
            .map_err(|e| InitializationError::VectorIndex(e.into()))?;
        let generator = llm::from_settings(&settings.generation)
            .map_err(|e| InitializationError::Generation(e.into()))?;

        let history = if settings.history.enabled {
            Some(
                ChatHistoryStore::new(&paths.db_path)
                    .await
                    .map_err(|e| InitializationError::History(e.into()))?,
            )
        } else {
            None
        };

        tracing::info!(
            "Using {} embeddings ({}-d), {} generation, collection '{}'",
            embedder.name(),
            embedder.dimension(),
            generator.name(),
            index.collection()
        );

        Ok(Arc::new(Self::from_parts(
            paths, config, settings, embedder, index, generator, history,
        )))
    }

    /// Wires pipelines around already-built providers.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppSettings,
        embedder: Arc<dyn EmbeddingGateway>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationGateway>,
        history: Option<ChatHistoryStore>,
    ) -> Self {
        let answers = AnswerPipeline::new(
            embedder.clone(),
            index.clone(),
            generator,
            PromptBuilder::new(settings.prompt.clone()),
        )
        .with_top_k(settings.retrieval.top_k);

        let ingestion = IngestionPipeline::new(
            embedder,
            index.clone(),
            IngestionConfig {
                chunking: settings.chunking,
                batch_size: settings.ingestion.batch_size,
                concurrency: settings.ingestion.concurrency,
                extensions: settings.ingestion.extensions.clone(),
            },
        );

        Self {
            paths,
            config,
            settings: Arc::new(settings),
            answers: Arc::new(answers),
            ingestion: Arc::new(ingestion),
            index,
            history,
        }
    }

    /// Configured corpus location, anchored at the project root.
    pub fn corpus_root(&self) -> PathBuf {
        self.paths.resolve(&self.settings.ingestion.corpus_root)
    }
}
