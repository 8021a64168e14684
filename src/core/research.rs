//! Research session configuration produced by the elicitation manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Inclusive bounds for the researcher count.
pub const RESEARCHER_COUNT_RANGE: (u32, u32) = (1, 100);
/// Inclusive bounds for the session timeout in minutes.
pub const TIMEOUT_MINUTES_RANGE: (u32, u32) = (5, 1440);

/// How exhaustively each worker investigates its sub-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    /// Quick overview.
    Basic,
    /// Comprehensive analysis.
    #[default]
    Standard,
    /// Exhaustive investigation.
    Deep,
}

impl ResearchDepth {
    /// Parses a depth from an answer string, falling back to the default.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "basic" => Self::Basic,
            "deep" => Self::Deep,
            _ => Self::Standard,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }
}

/// Shape of the final deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Structured JSON report payload.
    #[default]
    StructuredJson,
    /// Rendered Markdown report.
    MarkdownReport,
    /// Executive summary only.
    ExecutiveSummary,
    /// Raw aggregated data.
    RawData,
}

impl OutputFormat {
    /// Parses an output format from an answer string, falling back to the default.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "markdown_report" => Self::MarkdownReport,
            "executive_summary" => Self::ExecutiveSummary,
            "raw_data" => Self::RawData,
            _ => Self::StructuredJson,
        }
    }
}

/// Priority of a session; maps to worker resource limits, not scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    /// Cost-optimized.
    Low,
    /// Balanced.
    #[default]
    Normal,
    /// Performance-optimized.
    High,
}

impl PriorityLevel {
    /// Parses a priority from an answer string, falling back to the default.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Normal,
        }
    }
}

/// Validated configuration for one research session.
///
/// Produced only by the elicitation manager once its state machine reaches
/// `complete`; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Session id, stable across MCP calls.
    pub session_id: String,
    /// Research topic.
    pub topic: String,
    /// Requested number of research workers (1..=100).
    pub researcher_count: u32,
    /// Investigation depth.
    pub research_depth: ResearchDepth,
    /// Deliverable format.
    pub output_format: OutputFormat,
    /// Wall-clock budget in minutes (5..=1440).
    pub timeout_minutes: u32,
    /// Priority level.
    pub priority_level: PriorityLevel,
    /// Optional pre-orchestrated workflow template text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_templates: Option<String>,
    /// Optional source hints supplied during elicitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_sources: Option<String>,
    /// When the elicitation session started.
    pub created_at: DateTime<Utc>,
}

impl ResearchConfig {
    /// Validates ranges before a session is created.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] on an empty topic or an
    /// out-of-range researcher count or timeout.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.topic.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                message: "research topic cannot be empty".to_string(),
            });
        }

        let (lo, hi) = RESEARCHER_COUNT_RANGE;
        if !(lo..=hi).contains(&self.researcher_count) {
            return Err(OrchestratorError::Validation {
                message: format!(
                    "researcher_count {} out of range {lo}..={hi}",
                    self.researcher_count
                ),
            });
        }

        let (lo, hi) = TIMEOUT_MINUTES_RANGE;
        if !(lo..=hi).contains(&self.timeout_minutes) {
            return Err(OrchestratorError::Validation {
                message: format!(
                    "timeout_minutes {} out of range {lo}..={hi}",
                    self.timeout_minutes
                ),
            });
        }

        Ok(())
    }
}
