//! Sequential-thinking operation.
//!
//! A deterministic stepwise reasoning scaffold: the problem and optional
//! context are unfolded into numbered thought steps with confidences and
//! a closing recommendation. Deliberately model-free so the operation
//! works without any credential.

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Parameters of the `sequential-thinking` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingParams {
    /// The problem to reason about.
    pub problem: String,
    /// Optional surrounding context.
    #[serde(default)]
    pub context: Option<String>,
    /// Optional caller-suggested steps, appended to the scaffold.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Cap on the number of thought steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    10
}

/// One step of the reasoning chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtStep {
    /// 1-based step number.
    pub step: usize,
    /// The thought itself.
    pub thought: String,
    /// Why this step follows.
    pub reasoning: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Response of the `sequential-thinking` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingResponse {
    /// The reasoning chain.
    pub thoughts: Vec<ThoughtStep>,
    /// Closing recommendation.
    pub solution: String,
    /// Overall confidence.
    pub confidence: f64,
}

/// Runs the reasoning scaffold.
///
/// # Errors
///
/// Returns [`OrchestratorError::Validation`] when the problem is empty.
pub fn run(params: &ThinkingParams) -> Result<ThinkingResponse, OrchestratorError> {
    if params.problem.trim().is_empty() {
        return Err(OrchestratorError::Validation {
            message: "problem parameter is required".to_string(),
        });
    }

    let mut thoughts = vec![
        ThoughtStep {
            step: 1,
            thought: format!("Understanding the problem: {}", params.problem),
            reasoning: "First, we need to clearly understand what we're trying to solve"
                .to_string(),
            confidence: 0.95,
        },
        ThoughtStep {
            step: 2,
            thought: match &params.context {
                Some(context) if !context.is_empty() => {
                    format!("Analyzing the context: {context}")
                }
                _ => "Analyzing the context and constraints".to_string(),
            },
            reasoning: "Context provides important boundaries and requirements".to_string(),
            confidence: 0.90,
        },
        ThoughtStep {
            step: 3,
            thought: "Generating potential solutions".to_string(),
            reasoning: "Based on the problem and context, we can identify approaches"
                .to_string(),
            confidence: 0.85,
        },
    ];

    for step in &params.steps {
        let number = thoughts.len() + 1;
        thoughts.push(ThoughtStep {
            step: number,
            thought: step.clone(),
            reasoning: "Caller-suggested step".to_string(),
            confidence: 0.80,
        });
    }
    thoughts.truncate(params.max_steps.max(1));

    let confidence =
        thoughts.iter().map(|t| t.confidence).sum::<f64>() / thoughts.len() as f64;

    Ok(ThinkingResponse {
        thoughts,
        solution: "Based on sequential analysis, the recommended approach is to proceed \
                   with distributed research"
            .to_string(),
        confidence,
    })
}
