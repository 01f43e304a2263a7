use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::llm::GenerationError;
use crate::vector::IndexError;

#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to read corpus at {}: {source}", path.display())]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification reported alongside degraded answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmbeddingFailure,
    IndexUnavailable,
    GenerationFailure,
    CorpusReadFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::EmbeddingFailure => "embedding_failure",
            FailureKind::IndexUnavailable => "index_unavailable",
            FailureKind::GenerationFailure => "generation_failure",
            FailureKind::CorpusReadFailure => "corpus_read_failure",
        }
    }
}

impl RagError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RagError::Embedding(_) => FailureKind::EmbeddingFailure,
            RagError::Index(_) => FailureKind::IndexUnavailable,
            RagError::Generation(_) => FailureKind::GenerationFailure,
            RagError::CorpusRead { .. } => FailureKind::CorpusReadFailure,
        }
    }

    pub fn corpus_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RagError::CorpusRead {
            path: path.into(),
            source,
        }
    }
}
