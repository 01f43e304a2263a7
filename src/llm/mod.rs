//! Answer generation against an OpenAI-compatible chat completions API.

pub mod openai;
pub mod provider;
pub mod types;


pub use openai::OpenAiChatProvider;
pub use provider::{GenerationError, GenerationGateway};
pub use types::{ChatMessage, ChatRequest};

use std::sync::Arc;

use crate::core::config::GenerationSettings;

pub fn from_settings(
    settings: &GenerationSettings,
) -> Result<Arc<dyn GenerationGateway>, GenerationError> {
    Ok(Arc::new(OpenAiChatProvider::new(settings)?))
}
