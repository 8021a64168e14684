//! Question and response types for the elicitation flow.

use serde::{Deserialize, Serialize};

use super::research::ResearchConfig;

/// Input widget the client should render for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Free text.
    Text,
    /// Numeric input.
    Number,
    /// Single choice from `options`.
    Select,
}

/// One option of a select question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Machine value submitted back as the answer.
    pub value: String,
    /// Human-readable label.
    pub label: String,
}

impl QuestionOption {
    /// Creates an option.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Presentation hints for a question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionMeta {
    /// Example input shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Whether the text widget should be multiline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
    /// Minimum for number questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Maximum for number questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Default applied when the answer is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// A question in the elicitation flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Answer key the client echoes back.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Input widget.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Whether an answer is expected. Missing required answers fall back
    /// to documented defaults rather than failing.
    pub required: bool,
    /// Choices for select questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    /// Presentation hints.
    #[serde(default, skip_serializing_if = "meta_is_empty")]
    pub metadata: QuestionMeta,
}

fn meta_is_empty(meta: &QuestionMeta) -> bool {
    meta.placeholder.is_none()
        && meta.multiline.is_none()
        && meta.min.is_none()
        && meta.max.is_none()
        && meta.default.is_none()
}

/// Whether a response carries questions or a finished configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// More questions to answer.
    Elicitation,
    /// The configuration is complete.
    Ready,
}

/// Response from an elicitation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationResponse {
    /// Whether more questions follow.
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Next question set, empty when `kind` is `ready`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
    /// Session the exchange belongs to.
    pub session_id: String,
    /// Optional status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The finished configuration once `kind` is `ready`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ResearchConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_wire_shape() {
        let q = Question {
            id: "research_depth".to_string(),
            question: "What level of research depth do you need?".to_string(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![QuestionOption::new("basic", "Basic - Quick overview")],
            metadata: QuestionMeta::default(),
        };
        let json = serde_json::to_string(&q).unwrap_or_default();
        assert!(json.contains("\"type\":\"select\""));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn test_response_kind_wire_names() {
        let resp = ElicitationResponse {
            kind: ResponseKind::Ready,
            questions: Vec::new(),
            session_id: "s".to_string(),
            message: None,
            config: None,
        };
        let json = serde_json::to_string(&resp).unwrap_or_default();
        assert!(json.contains("\"type\":\"ready\""));
        assert!(!json.contains("questions"));
    }
}
