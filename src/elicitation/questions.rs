//! Fixed question sets for each elicitation state.

use serde_json::json;

use crate::core::{Question, QuestionKind, QuestionMeta, QuestionOption};
use crate::core::research::{RESEARCHER_COUNT_RANGE, TIMEOUT_MINUTES_RANGE};

/// Questions for the `initial` state.
#[must_use]
pub fn initial_questions() -> Vec<Question> {
    vec![
        Question {
            id: "research_topic".to_string(),
            question: "What would you like to perform research on?".to_string(),
            kind: QuestionKind::Text,
            required: true,
            options: Vec::new(),
            metadata: QuestionMeta {
                placeholder: Some(
                    "e.g., AI safety companies, renewable energy startups, etc.".to_string(),
                ),
                multiline: Some(true),
                ..QuestionMeta::default()
            },
        },
        Question {
            id: "researcher_count".to_string(),
            question: "How many researchers do you want to provision?".to_string(),
            kind: QuestionKind::Number,
            required: true,
            options: Vec::new(),
            metadata: QuestionMeta {
                min: Some(i64::from(RESEARCHER_COUNT_RANGE.0)),
                max: Some(i64::from(RESEARCHER_COUNT_RANGE.1)),
                default: Some(json!(10)),
                ..QuestionMeta::default()
            },
        },
        Question {
            id: "research_depth".to_string(),
            question: "What level of research depth do you need?".to_string(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                QuestionOption::new("basic", "Basic - Quick overview"),
                QuestionOption::new("standard", "Standard - Comprehensive analysis"),
                QuestionOption::new("deep", "Deep - Exhaustive investigation"),
            ],
            metadata: QuestionMeta::default(),
        },
    ]
}

/// Questions for the `workflow` state.
#[must_use]
pub fn workflow_questions() -> Vec<Question> {
    vec![
        Question {
            id: "workflow_templates".to_string(),
            question: "Do you have any pre-orchestrated workflows you want the researchers \
                       to use? If yes, paste them below:"
                .to_string(),
            kind: QuestionKind::Text,
            required: false,
            options: Vec::new(),
            metadata: QuestionMeta {
                placeholder: Some("Paste workflow YAML or JSON here (optional)".to_string()),
                multiline: Some(true),
                ..QuestionMeta::default()
            },
        },
        Question {
            id: "output_format".to_string(),
            question: "What format would you like the research results in?".to_string(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                QuestionOption::new("structured_json", "Structured JSON"),
                QuestionOption::new("markdown_report", "Markdown Report"),
                QuestionOption::new("executive_summary", "Executive Summary"),
                QuestionOption::new("raw_data", "Raw Data"),
            ],
            metadata: QuestionMeta::default(),
        },
    ]
}

/// Questions for the `advanced` state.
///
/// The sources question is included only when a topic was given.
#[must_use]
pub fn advanced_questions(topic: Option<&str>) -> Vec<Question> {
    let mut questions = vec![
        Question {
            id: "timeout_minutes".to_string(),
            question: "Maximum time for research completion (in minutes)?".to_string(),
            kind: QuestionKind::Number,
            required: true,
            options: Vec::new(),
            metadata: QuestionMeta {
                min: Some(i64::from(TIMEOUT_MINUTES_RANGE.0)),
                max: Some(i64::from(TIMEOUT_MINUTES_RANGE.1)),
                default: Some(json!(60)),
                ..QuestionMeta::default()
            },
        },
        Question {
            id: "priority_level".to_string(),
            question: "Research priority level?".to_string(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                QuestionOption::new("low", "Low - Cost-optimized"),
                QuestionOption::new("normal", "Normal - Balanced"),
                QuestionOption::new("high", "High - Performance-optimized"),
            ],
            metadata: QuestionMeta::default(),
        },
    ];

    if let Some(topic) = topic.filter(|t| !t.is_empty()) {
        questions.push(Question {
            id: "specific_sources".to_string(),
            question: format!("Any specific sources or domains to focus on for '{topic}'?"),
            kind: QuestionKind::Text,
            required: false,
            options: Vec::new(),
            metadata: QuestionMeta {
                placeholder: Some("e.g., specific websites, databases, or domains".to_string()),
                ..QuestionMeta::default()
            },
        });
    }

    questions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_question_ids() {
        let ids: Vec<_> = initial_questions().into_iter().map(|q| q.id).collect();
        assert_eq!(
            ids,
            vec!["research_topic", "researcher_count", "research_depth"]
        );
    }

    #[test]
    fn test_workflow_output_format_options() {
        let questions = workflow_questions();
        let format = questions
            .iter()
            .find(|q| q.id == "output_format")
            .expect("output_format question");
        assert_eq!(format.options.len(), 4);
        assert!(format.required);
    }

    #[test]
    fn test_advanced_sources_only_with_topic() {
        assert_eq!(advanced_questions(None).len(), 2);
        assert_eq!(advanced_questions(Some("")).len(), 2);
        let with_topic = advanced_questions(Some("fusion energy"));
        assert_eq!(with_topic.len(), 3);
        assert!(with_topic[2].question.contains("fusion energy"));
    }
}
