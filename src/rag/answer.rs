//! Query-time RAG.
//!
//! `try_answer` fails strictly on any embedding or generation error.
//! `answer` is the only place errors are swallowed: it classifies the
//! failure and turns it into an apologetic reply. Search errors are the
//! single exception; they degrade to the general-knowledge prompt so a
//! broken index never takes the answer path down.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::{FailureKind, RagError};
use super::prompt::PromptBuilder;
use crate::embedding::{EmbeddingGateway, EmbeddingMode};
use crate::llm::GenerationGateway;
use crate::vector::VectorIndex;

pub const DEFAULT_TOP_K: usize = 3;

/// Where the prompt's context came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Grounding {
    Override,
    Retrieved { passages: usize },
    GeneralKnowledge,
}

impl Grounding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grounding::Override => "override",
            Grounding::Retrieved { .. } => "retrieved",
            Grounding::GeneralKnowledge => "general_knowledge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Answer {
    Generated {
        text: String,
        grounding: Grounding,
    },
    Degraded {
        text: String,
        kind: FailureKind,
        cause: String,
    },
}

impl Answer {
    fn degraded(err: &RagError) -> Self {
        Answer::Degraded {
            text: format!(
                "Sorry, I encountered an error processing your request: {}",
                err
            ),
            kind: err.kind(),
            cause: err.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Answer::Generated { text, .. } | Answer::Degraded { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::Generated { text, .. } | Answer::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Answer::Degraded { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Answer::Degraded { kind, .. } => Some(*kind),
            Answer::Generated { .. } => None,
        }
    }

    /// Label stored with chat history.
    pub fn grounding_label(&self) -> &'static str {
        match self {
            Answer::Generated { grounding, .. } => grounding.as_str(),
            Answer::Degraded { .. } => "degraded",
        }
    }
}

pub struct AnswerPipeline {
    embedder: Arc<dyn EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerationGateway>,
    prompts: PromptBuilder,
    top_k: usize,
}

impl AnswerPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationGateway>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            prompts,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Always returns an answer. With `override_context` set, retrieval is
    /// skipped and the override is the only passage, even when empty.
    pub async fn answer(&self, query: &str, override_context: Option<&str>) -> Answer {
        match self.try_answer(query, override_context).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!("Answer degraded ({}): {}", err.kind().as_str(), err);
                Answer::degraded(&err)
            }
        }
    }

    pub async fn try_answer(
        &self,
        query: &str,
        override_context: Option<&str>,
    ) -> Result<Answer, RagError> {
        let (passages, grounding) = match override_context {
            Some(context) => (vec![context.to_string()], Grounding::Override),
            None => {
                let passages = self.retrieve(query).await?;
                let grounding = if passages.is_empty() {
                    Grounding::GeneralKnowledge
                } else {
                    Grounding::Retrieved {
                        passages: passages.len(),
                    }
                };
                (passages, grounding)
            }
        };
        tracing::debug!("Answering with {} grounding", grounding.as_str());

        let prompt = self.prompts.build(query, &passages);
        let text = self.generator.complete(&prompt).await?;
        Ok(Answer::Generated {
            text: text.trim().to_string(),
            grounding,
        })
    }

    /// Top passages for `query`. Embedding errors propagate; search errors
    /// are logged and read as "no passages".
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RagError> {
        let vector = self.embedder.embed(query, EmbeddingMode::Query).await?;
        match self.index.search(&vector, self.top_k).await {
            Ok(hits) => Ok(hits.into_iter().map(|hit| hit.payload.text).collect()),
            Err(err) => {
                tracing::warn!(
                    "Search in '{}' failed, answering without context: {}",
                    self.index.collection(),
                    err
                );
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::llm::GenerationError;
    use crate::rag::REFUSAL_SENTENCE;
    use crate::vector::{Distance, IndexError, Payload, Point, ScoredPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubEmbedder {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }
    }

    #[async_trait]
    impl EmbeddingGateway for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(mode, EmbeddingMode::Query);
            if self.fail {
                return Err(EmbeddingError::Provider {
                    status: 429,
                    body: "quota exceeded".to_string(),
                });
            }
            Ok(vec![1.0, 0.0])
        }
    }

    /// Returns canned hits, or fails every call.
    struct StubIndex {
        hits: Vec<&'static str>,
        fail: bool,
        searches: AtomicUsize,
    }

    impl StubIndex {
        fn with_hits(hits: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                hits,
                fail: false,
                searches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VectorIndex for StubIndex {
        fn collection(&self) -> &str {
            "stub"
        }

        async fn recreate_collection(&self, _d: usize, _m: Distance) -> Result<(), IndexError> {
            Ok(())
        }

        async fn upsert(&self, _points: Vec<Point>) -> Result<(), IndexError> {
            Ok(())
        }

        async fn search(&self, _v: &[f32], top_k: usize) -> Result<Vec<ScoredPayload>, IndexError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IndexError::Unexpected {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            Ok(self
                .hits
                .iter()
                .take(top_k)
                .enumerate()
                .map(|(i, text)| ScoredPayload {
                    id: i as u64,
                    score: 1.0 - i as f32 * 0.1,
                    payload: Payload {
                        text: text.to_string(),
                    },
                })
                .collect())
        }

        async fn count(&self) -> Result<usize, IndexError> {
            Ok(self.hits.len())
        }
    }

    /// Records prompts and replies with fixed text.
    struct StubGenerator {
        prompts: Mutex<Vec<String>>,
        reply: Result<&'static str, u16>,
    }

    impl StubGenerator {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Ok(reply),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationGateway for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(GenerationError::Provider {
                    status,
                    body: "model overloaded".to_string(),
                }),
            }
        }
    }

    fn pipeline(
        embedder: Arc<StubEmbedder>,
        index: Arc<StubIndex>,
        generator: Arc<StubGenerator>,
    ) -> AnswerPipeline {
        AnswerPipeline::new(embedder, index, generator, PromptBuilder::default())
    }

    #[tokio::test]
    async fn retrieved_passages_ground_the_prompt() {
        let generator = StubGenerator::replying("  ROS 2 is middleware.\n");
        let pipeline = pipeline(
            StubEmbedder::ok(),
            StubIndex::with_hits(vec!["ROS 2 is a middleware for robotics.", "DDS carries messages."]),
            generator.clone(),
        );

        let answer = pipeline.answer("What is ROS 2?", None).await;

        assert_eq!(
            answer,
            Answer::Generated {
                text: "ROS 2 is middleware.".to_string(),
                grounding: Grounding::Retrieved { passages: 2 },
            }
        );
        let prompt = generator.last_prompt();
        assert!(prompt.contains(
            "Context:\nROS 2 is a middleware for robotics.\n\nDDS carries messages."
        ));
        assert!(prompt.contains("What is ROS 2?"));
        assert!(prompt.contains(REFUSAL_SENTENCE));
    }

    #[tokio::test]
    async fn top_k_limits_retrieval() {
        let generator = StubGenerator::replying("ok");
        let pipeline = pipeline(
            StubEmbedder::ok(),
            StubIndex::with_hits(vec!["one", "two", "three", "four", "five"]),
            generator.clone(),
        );

        let answer = pipeline.answer("q", None).await;

        assert!(matches!(
            answer,
            Answer::Generated { grounding: Grounding::Retrieved { passages: 3 }, .. }
        ));
        assert!(!generator.last_prompt().contains("four"));
    }

    #[tokio::test]
    async fn empty_index_falls_back_to_general_knowledge() {
        let generator = StubGenerator::replying("Gazebo is a simulator.");
        let pipeline = pipeline(StubEmbedder::ok(), StubIndex::with_hits(vec![]), generator.clone());

        let answer = pipeline.answer("What is Gazebo?", None).await;

        assert!(matches!(
            answer,
            Answer::Generated { grounding: Grounding::GeneralKnowledge, .. }
        ));
        let prompt = generator.last_prompt();
        assert!(prompt.contains("general knowledge"));
        assert!(!prompt.contains("Context:"));
    }

    #[tokio::test]
    async fn search_failure_degrades_to_general_knowledge() {
        let generator = StubGenerator::replying("Still answered.");
        let index = Arc::new(StubIndex {
            hits: vec!["unused"],
            fail: true,
            searches: AtomicUsize::new(0),
        });
        let pipeline = pipeline(StubEmbedder::ok(), index.clone(), generator.clone());

        let answer = pipeline.answer("q", None).await;

        assert_eq!(answer.text(), "Still answered.");
        assert!(!answer.is_degraded());
        assert_eq!(index.searches.load(Ordering::SeqCst), 1);
        assert!(generator.last_prompt().contains("general knowledge"));
    }

    #[tokio::test]
    async fn override_context_bypasses_embedding_and_search() {
        let embedder = StubEmbedder::ok();
        let index = StubIndex::with_hits(vec!["should not appear"]);
        let generator = StubGenerator::replying("Answer from X.");
        let pipeline = pipeline(embedder.clone(), index.clone(), generator.clone());

        let answer = pipeline.answer("Explain this", Some("X")).await;

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.searches.load(Ordering::SeqCst), 0);
        assert!(matches!(
            answer,
            Answer::Generated { grounding: Grounding::Override, .. }
        ));
        let prompt = generator.last_prompt();
        assert!(prompt.contains("Context:\nX\n\n"));
        assert!(!prompt.contains("should not appear"));
    }

    #[tokio::test]
    async fn empty_override_still_skips_retrieval() {
        let embedder = StubEmbedder::ok();
        let generator = StubGenerator::replying("ok");
        let pipeline = pipeline(embedder.clone(), StubIndex::with_hits(vec![]), generator);

        let answer = pipeline.answer("q", Some("")).await;

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            answer,
            Answer::Generated { grounding: Grounding::Override, .. }
        ));
    }

    #[tokio::test]
    async fn generation_failure_returns_apology_with_cause() {
        let generator = Arc::new(StubGenerator {
            prompts: Mutex::new(Vec::new()),
            reply: Err(503),
        });
        let pipeline = pipeline(StubEmbedder::ok(), StubIndex::with_hits(vec!["ctx"]), generator);

        let answer = pipeline.answer("q", None).await;

        assert!(answer.is_degraded());
        assert_eq!(answer.failure_kind(), Some(FailureKind::GenerationFailure));
        assert!(answer
            .text()
            .starts_with("Sorry, I encountered an error processing your request:"));
        assert!(answer.text().contains("model overloaded"));
        assert_eq!(answer.grounding_label(), "degraded");
    }

    #[tokio::test]
    async fn embedding_failure_is_degraded_not_raised() {
        let embedder = Arc::new(StubEmbedder {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let generator = StubGenerator::replying("unused");
        let pipeline = pipeline(embedder, StubIndex::with_hits(vec![]), generator.clone());

        let answer = pipeline.answer("q", None).await;

        assert_eq!(answer.failure_kind(), Some(FailureKind::EmbeddingFailure));
        assert!(answer.text().contains("429"));
        assert!(generator.prompts.lock().unwrap().is_empty());

        let strict = pipeline.try_answer("q", None).await;
        assert!(matches!(strict, Err(RagError::Embedding(_))));
    }

    #[test]
    fn answer_serialises_with_status_tag() {
        let answer = Answer::Generated {
            text: "hi".to_string(),
            grounding: Grounding::Retrieved { passages: 2 },
        };
        let json = serde_json::to_value(&answer).expect("json");
        assert_eq!(json["status"], "generated");
        assert_eq!(json["grounding"]["source"], "retrieved");
        assert_eq!(json["grounding"]["passages"], 2);
    }
}
