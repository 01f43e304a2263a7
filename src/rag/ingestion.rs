//! Index rebuild from a markdown corpus.
//!
//! Every run is a new generation: the collection is dropped and recreated,
//! then refilled batch by batch. There is no incremental path. A failure at
//! any step aborts the run and leaves the collection partially filled until
//! the next successful run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;
use walkdir::WalkDir;

use super::chunker::{ChunkingConfig, MarkdownChunker, TextChunk};
use super::error::RagError;
use crate::embedding::{EmbeddingError, EmbeddingGateway, EmbeddingMode};
use crate::vector::{Distance, Payload, Point, VectorIndex};

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub chunking: ChunkingConfig,
    /// Chunks per embedding request and per upsert.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub concurrency: usize,
    /// File extensions treated as markdown, without the dot.
    pub extensions: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            batch_size: 10,
            concurrency: 1,
            extensions: vec!["md".to_string(), "mdx".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub generation: Uuid,
    pub documents: usize,
    pub chunks: usize,
    pub batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
    chunker: MarkdownChunker,
    config: IngestionConfig,
    run_lock: Mutex<()>,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        index: Arc<dyn VectorIndex>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker: MarkdownChunker::new(config.chunking),
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Rebuilds the index from `corpus_root` and returns the chunk count.
    pub async fn ingest(&self, corpus_root: &Path) -> Result<usize, RagError> {
        Ok(self.ingest_with_report(corpus_root).await?.chunks)
    }

    pub async fn ingest_with_report(&self, corpus_root: &Path) -> Result<IngestionReport, RagError> {
        // Runs are serialized; queries are not blocked.
        let _guard = self.run_lock.lock().await;

        let generation = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            "Ingestion {} starting from {}",
            generation,
            corpus_root.display()
        );

        let files = self.discover(corpus_root)?;
        let mut corpus = String::new();
        for path in &files {
            tracing::debug!("Reading {}", path.display());
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| RagError::corpus_read(path, e))?;
            corpus.push_str(&text);
            corpus.push_str("\n\n");
        }

        let chunks = self.chunker.split(&corpus);
        tracing::info!(
            "Ingestion {}: {} documents, {} chunks",
            generation,
            files.len(),
            chunks.len()
        );

        self.index
            .recreate_collection(self.embedder.dimension(), Distance::Cosine)
            .await?;

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<&[TextChunk]> = chunks.chunks(batch_size).collect();
        let total_batches = batches.len();

        stream::iter(
            batches
                .into_iter()
                .enumerate()
                .map(Ok::<_, RagError>),
        )
        .try_for_each_concurrent(self.config.concurrency.max(1), |(number, batch)| async move {
            self.index_batch(batch).await?;
            tracing::info!(
                "Ingestion {}: batch {}/{} upserted",
                generation,
                number + 1,
                total_batches
            );
            Ok(())
        })
        .await?;

        let report = IngestionReport {
            generation,
            documents: files.len(),
            chunks: chunks.len(),
            batches: total_batches,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            "Ingestion {} finished: {} chunks into '{}'",
            generation,
            report.chunks,
            self.index.collection()
        );
        Ok(report)
    }

    /// Markdown files under `root`, sorted by path so runs are reproducible.
    fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, RagError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                RagError::corpus_read(path, e.into())
            })?;
            if entry.file_type().is_file() && self.is_markdown(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    async fn index_batch(&self, batch: &[TextChunk]) -> Result<(), RagError> {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_many(&texts, EmbeddingMode::Document)
            .await?;
        if vectors.len() != batch.len() {
            return Err(EmbeddingError::Malformed(format!(
                "requested {} embeddings, received {}",
                batch.len(),
                vectors.len()
            ))
            .into());
        }

        let points = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| Point {
                id: chunk.index as u64,
                vector,
                payload: Payload {
                    text: chunk.text.clone(),
                },
            })
            .collect();
        self.index.upsert(points).await?;
        Ok(())
    }
}
