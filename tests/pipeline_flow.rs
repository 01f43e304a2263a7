mod common;

use std::sync::Arc;

use common::{ros_document, KeywordEmbedder, RecordingGenerator};
use textbook_rag::embedding::EmbeddingMode;
use textbook_rag::rag::{
    Answer, AnswerPipeline, FailureKind, Grounding, IngestionConfig, IngestionPipeline,
    PromptBuilder,
};
use textbook_rag::vector::{InMemoryVectorIndex, VectorIndex};

fn corpus_with(docs: &[(&str, String)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, text) in docs {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, text).expect("write doc");
    }
    dir
}

#[tokio::test]
async fn ros2_corpus_is_ingested_and_grounds_the_answer() {
    let corpus = corpus_with(&[("docs/intro.md", ros_document())]);
    let embedder = KeywordEmbedder::new();
    let index = Arc::new(InMemoryVectorIndex::default());

    let ingestion = IngestionPipeline::new(embedder.clone(), index.clone(), IngestionConfig::default());
    let count = ingestion.ingest(corpus.path()).await.expect("ingest");

    assert!(count >= 2, "expected at least two chunks, got {count}");
    assert_eq!(index.count().await.expect("count"), count);
    let first = index.search(&[1.0, 1.0], 1).await.expect("search");
    assert_eq!(first[0].id, 0);
    assert!(first[0].payload.text.starts_with("ROS 2 is a middleware"));
    assert!(embedder
        .modes
        .lock()
        .unwrap()
        .iter()
        .all(|mode| *mode == EmbeddingMode::Document));

    let generator = RecordingGenerator::replying("ROS 2 is robotics middleware.");
    let answers = AnswerPipeline::new(
        embedder.clone(),
        index.clone(),
        generator.clone(),
        PromptBuilder::default(),
    );
    let answer = answers.answer("What is ROS 2?", None).await;

    assert_eq!(answer.text(), "ROS 2 is robotics middleware.");
    assert!(matches!(
        answer,
        Answer::Generated { grounding: Grounding::Retrieved { .. }, .. }
    ));
    let prompt = generator.last_prompt();
    assert!(prompt.contains("ROS 2 is a middleware"));
    assert!(prompt.contains("What is ROS 2?"));
    assert_eq!(
        embedder.modes.lock().unwrap().last(),
        Some(&EmbeddingMode::Query)
    );
}

#[tokio::test]
async fn reingestion_replaces_the_previous_generation() {
    let corpus = corpus_with(&[("a.md", ros_document())]);
    let index = Arc::new(InMemoryVectorIndex::default());
    let ingestion = IngestionPipeline::new(
        KeywordEmbedder::new(),
        index.clone(),
        IngestionConfig::default(),
    );

    let first = ingestion.ingest(corpus.path()).await.expect("first run");
    std::fs::write(corpus.path().join("a.md"), "A single short page.").expect("rewrite");
    let second = ingestion.ingest(corpus.path()).await.expect("second run");

    assert!(first >= 2);
    assert_eq!(second, 1);
    assert_eq!(index.count().await.expect("count"), 1);
}

#[tokio::test]
async fn empty_corpus_yields_zero_and_answers_from_general_knowledge() {
    let corpus = corpus_with(&[("notes.txt", "not markdown".to_string())]);
    let index = Arc::new(InMemoryVectorIndex::default());
    let embedder = KeywordEmbedder::new();

    let count = IngestionPipeline::new(embedder.clone(), index.clone(), IngestionConfig::default())
        .ingest(corpus.path())
        .await
        .expect("ingest");
    assert_eq!(count, 0);
    assert_eq!(index.count().await.expect("count"), 0);

    let generator = RecordingGenerator::replying("From general knowledge.");
    let answer = AnswerPipeline::new(embedder, index, generator.clone(), PromptBuilder::default())
        .answer("What is NVIDIA Isaac?", None)
        .await;

    assert!(matches!(
        answer,
        Answer::Generated { grounding: Grounding::GeneralKnowledge, .. }
    ));
    let prompt = generator.last_prompt();
    assert!(prompt.contains("general knowledge"));
    assert!(!prompt.contains("Context:"));
}

#[tokio::test]
async fn never_ingested_index_uses_fallback_prompt() {
    let generator = RecordingGenerator::replying("ok");
    let answers = AnswerPipeline::new(
        KeywordEmbedder::new(),
        Arc::new(InMemoryVectorIndex::default()),
        generator.clone(),
        PromptBuilder::default(),
    );

    let answer = answers.answer("What is ROS 2?", None).await;

    assert!(!answer.is_degraded());
    assert!(generator.last_prompt().contains("general knowledge"));
}

#[tokio::test]
async fn override_context_skips_embedding_entirely() {
    let embedder = KeywordEmbedder::new();
    let generator = RecordingGenerator::replying("Answer about X.");
    let answers = AnswerPipeline::new(
        embedder.clone(),
        Arc::new(InMemoryVectorIndex::default()),
        generator.clone(),
        PromptBuilder::default(),
    );

    let answer = answers.answer("Summarise this", Some("X")).await;

    assert_eq!(embedder.calls(), 0);
    assert_eq!(answer.text(), "Answer about X.");
    assert!(generator.last_prompt().contains("Context:\nX\n"));
}

#[tokio::test]
async fn generation_failure_is_folded_into_the_answer() {
    let generator = RecordingGenerator::failing(429, "Rate limit reached for model");
    let answers = AnswerPipeline::new(
        KeywordEmbedder::new(),
        Arc::new(InMemoryVectorIndex::default()),
        generator,
        PromptBuilder::default(),
    );

    let answer = answers.answer("What is ROS 2?", None).await;

    assert_eq!(answer.failure_kind(), Some(FailureKind::GenerationFailure));
    assert!(answer.text().contains("Rate limit reached for model"));
}
