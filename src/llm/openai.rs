use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::provider::{GenerationError, GenerationGateway};
use super::types::{ChatCompletion, ChatMessage, ChatRequest};
use crate::core::config::GenerationSettings;

/// Chat completions client for Groq and other OpenAI-compatible servers.
#[derive(Clone)]
pub struct OpenAiChatProvider {
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
    client: Client,
}

impl OpenAiChatProvider {
    pub fn new(settings: &GenerationSettings) -> Result<Self, GenerationError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::NotConfigured("generation.api_key is missing".to_string())
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(GenerationError::Transport)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            settings: settings.clone(),
            client,
        })
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest::new(self.settings.model.clone(), vec![ChatMessage::user(prompt)])
            .with_settings(&self.settings)
    }
}

pub(crate) fn first_choice_text(completion: ChatCompletion) -> Result<String, GenerationError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| GenerationError::Malformed("response has no message content".to_string()))
}

#[async_trait]
impl GenerationGateway for OpenAiChatProvider {
    fn name(&self) -> &str {
        if self.base_url.contains("groq.com") {
            "groq"
        } else {
            "openai"
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(GenerationError::Transport)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Provider { status, body });
        }

        let completion: ChatCompletion = res
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        first_choice_text(completion)
    }
}
