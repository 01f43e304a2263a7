use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("generation provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("malformed generation response: {0}")]
    Malformed(String),
    #[error("generation provider is not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// provider name for logs (e.g. "groq")
    fn name(&self) -> &str;

    /// single-turn completion; returns the trimmed model text
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
