#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use textbook_rag::embedding::{EmbeddingError, EmbeddingGateway, EmbeddingMode};
use textbook_rag::llm::{GenerationError, GenerationGateway};

/// Two-dimensional embedding: `[mentions "ros 2", 1]`. Passages about ROS 2
/// score highest for ROS 2 questions.
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub modes: Mutex<Vec<EmbeddingMode>>,
}

impl KeywordEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingGateway for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn dimension(&self) -> usize {
        2
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        let mentions = if text.to_lowercase().contains("ros 2") {
            1.0
        } else {
            0.0
        };
        Ok(vec![mentions, 1.0])
    }
}

/// Records every prompt and answers with a fixed reply or a provider error.
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
    reply: Result<String, (u16, String)>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: Ok(reply.to_string()),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            reply: Err((status, body.to_string())),
        })
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GenerationGateway for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(GenerationError::Provider {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// One document that opens with the ROS 2 sentence and is padded past a
/// single 1000-character chunk.
pub fn ros_document() -> String {
    format!(
        "ROS 2 is a middleware for robotics.\n\n{}",
        "Actuators convert energy into motion for humanoid joints. ".repeat(40)
    )
}
