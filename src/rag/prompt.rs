use serde::{Deserialize, Serialize};

/// Sentence the generator is told to emit when the context lacks an answer.
/// Advisory only; nothing checks the model actually uses it.
pub const REFUSAL_SENTENCE: &str =
    "I don't have enough information to answer that question based on the provided textbook content.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Book title used in the assistant preamble.
    pub subject: String,
    /// Topics named in the general-knowledge fallback.
    pub general_topics: Vec<String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            subject: "Physical AI & Humanoid Robotics".to_string(),
            general_topics: [
                "Physical AI",
                "Humanoid Robotics",
                "ROS 2",
                "NVIDIA Isaac",
                "Gazebo simulation",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    settings: PromptSettings,
}

impl PromptBuilder {
    pub fn new(settings: PromptSettings) -> Self {
        Self { settings }
    }

    /// Grounded prompt when `passages` is non-empty, otherwise the
    /// general-knowledge fallback.
    pub fn build(&self, query: &str, passages: &[String]) -> String {
        if passages.is_empty() {
            return self.general_knowledge(query);
        }

        format!(
            "{preamble}\n\
             Answer the following question based only on the provided context.\n\
             If the answer cannot be found in the context, respond with '{refusal}'\n\n\
             Context:\n{context}\n\n\
             Question: {query}\n\
             Answer:",
            preamble = self.preamble(),
            refusal = REFUSAL_SENTENCE,
            context = passages.join("\n\n"),
        )
    }

    fn general_knowledge(&self, query: &str) -> String {
        let topics = if self.settings.general_topics.is_empty() {
            self.settings.subject.clone()
        } else {
            self.settings.general_topics.join(", ")
        };
        format!(
            "{preamble}\n\
             The textbook content has not been indexed yet. Please answer the question based on \
             your general knowledge about {topics}, and related topics.\n\n\
             Question: {query}\n\
             Answer:",
            preamble = self.preamble(),
        )
    }

    fn preamble(&self) -> String {
        format!(
            "You are an AI assistant for a textbook on {}.",
            self.settings.subject
        )
    }
}
