//! Retrieval-augmented generation core.
//!
//! - `MarkdownChunker`: splits book text into overlapping passages
//! - `IngestionPipeline`: rebuilds the vector index from a markdown corpus
//! - `AnswerPipeline`: retrieves passages for a query and prompts the generator

mod answer;
mod chunker;
mod error;
mod ingestion;
mod prompt;

pub use answer::{Answer, AnswerPipeline, Grounding, DEFAULT_TOP_K};
pub use chunker::{split_text, ChunkingConfig, MarkdownChunker, TextChunk};
pub use error::{FailureKind, RagError};
pub use ingestion::{IngestionConfig, IngestionPipeline, IngestionReport};
pub use prompt::{PromptBuilder, PromptSettings, REFUSAL_SENTENCE};
