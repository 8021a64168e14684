//! Sub-query planning.
//!
//! The planner splits a research topic into atomic sub-queries, one per
//! worker. With a planner API key configured, an OpenAI-compatible model
//! does the splitting; without one, a deterministic generator is used.
//! The mock is a documented test seam, not a degraded fallback: fixtures
//! let tests pin exact sub-query lists for specific topics.

use std::collections::HashMap;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_trait::async_trait;

use crate::config::Settings;
use crate::error::OrchestratorError;

const PLANNER_SYSTEM_PROMPT: &str = "You are a research planning agent. Split the given \
research topic into the requested number of focused, independent sub-queries that together \
cover the topic. Respond with a JSON array of strings and nothing else.";

/// Splits a topic into sub-queries.
#[async_trait]
pub trait SubQueryPlanner: Send + Sync {
    /// Produces sub-queries for `topic`. The planner may return more or
    /// fewer than `count`; the orchestrator truncates or shrinks the
    /// fleet accordingly.
    async fn plan(&self, topic: &str, count: usize) -> Result<Vec<String>, OrchestratorError>;
}

/// Deterministic planner used when no API key is configured.
#[derive(Debug, Default)]
pub struct MockPlanner {
    fixtures: HashMap<String, Vec<String>>,
}

impl MockPlanner {
    /// Creates a planner with no fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fixed sub-query list for a topic. Fixtures are
    /// returned as-is, regardless of the requested count.
    #[must_use]
    pub fn with_fixture(mut self, topic: impl Into<String>, queries: Vec<String>) -> Self {
        self.fixtures.insert(topic.into(), queries);
        self
    }
}

#[async_trait]
impl SubQueryPlanner for MockPlanner {
    async fn plan(&self, topic: &str, count: usize) -> Result<Vec<String>, OrchestratorError> {
        if let Some(fixture) = self.fixtures.get(topic) {
            return Ok(fixture.clone());
        }
        Ok((1..=count)
            .map(|i| format!("sub-query {i} for {topic}"))
            .collect())
    }
}

/// LLM-backed planner over an OpenAI-compatible chat API.
pub struct OpenAiPlanner {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiPlanner {
    /// Creates a planner from settings. Requires `planner_api_key`.
    #[must_use]
    pub fn new(api_key: &str, settings: &Settings) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
            model: settings.planner_model.clone(),
        }
    }

    /// Parses the model's reply as a JSON array of strings, stripping
    /// markdown code fences when present.
    fn parse_queries(content: &str) -> Result<Vec<String>, OrchestratorError> {
        let trimmed = content.trim();
        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        serde_json::from_str::<Vec<String>>(json_str).map_err(|e| OrchestratorError::Planner {
            message: format!("planner returned malformed sub-query list: {e}"),
        })
    }
}

#[async_trait]
impl SubQueryPlanner for OpenAiPlanner {
    async fn plan(&self, topic: &str, count: usize) -> Result<Vec<String>, OrchestratorError> {
        let user_msg = format!("Topic: {topic}\nNumber of sub-queries: {count}");
        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(
                        PLANNER_SYSTEM_PROMPT.to_string(),
                    ),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(user_msg),
                    name: None,
                }),
            ],
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| OrchestratorError::Planner {
                message: format!("planner request failed: {e}"),
            })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Self::parse_queries(&content)
    }
}

/// Picks the planner implied by the settings: LLM-backed when a key is
/// present, deterministic mock otherwise.
#[must_use]
pub fn planner_from_settings(settings: &Settings) -> std::sync::Arc<dyn SubQueryPlanner> {
    match settings.planner_api_key.as_deref() {
        Some(key) => std::sync::Arc::new(OpenAiPlanner::new(key, settings)),
        None => std::sync::Arc::new(MockPlanner::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_planner_is_deterministic() {
        let planner = MockPlanner::new();
        let a = planner.plan("fusion", 3).await.unwrap();
        let b = planner.plan("fusion", 3).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0], "sub-query 1 for fusion");
        assert_eq!(a.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_planner_fixture_overrides_count() {
        let planner = MockPlanner::new().with_fixture(
            "narrow topic",
            vec!["q1".to_string(), "q2".to_string()],
        );
        let queries = planner.plan("narrow topic", 5).await.unwrap();
        assert_eq!(queries, vec!["q1", "q2"]);
    }

    #[test]
    fn test_parse_queries_plain_and_fenced() {
        let plain = r#"["a", "b"]"#;
        assert_eq!(
            OpenAiPlanner::parse_queries(plain).unwrap(),
            vec!["a", "b"]
        );

        let fenced = "```json\n[\"a\"]\n```";
        assert_eq!(OpenAiPlanner::parse_queries(fenced).unwrap(), vec!["a"]);

        assert!(OpenAiPlanner::parse_queries("not json").is_err());
    }
}
