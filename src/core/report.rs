//! Structured report types produced by the report assembler.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::result::ResearchMetrics;

/// A recurring structure discovered in the collected data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Short pattern name.
    pub name: String,
    /// What the pattern means.
    pub description: String,
    /// How many results exhibit it.
    pub frequency: usize,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Analysis derived from a set of worker results.
///
/// Computed by the analyzer and consumed by the report assembler. The
/// duration is stamped by the caller so the analysis itself stays free of
/// clock reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataAnalysis {
    /// Discovered patterns.
    pub patterns: Vec<Pattern>,
    /// Highest-confidence insights, best first.
    pub top_insights: Vec<String>,
    /// Statistics blob rendered into the report's data section.
    pub statistics: Map<String, Value>,
    /// Wall-clock duration of the session, in seconds on the wire.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Mean confidence across patterns.
    pub average_confidence: f64,
    /// Session metrics snapshot.
    pub metrics: ResearchMetrics,
}

/// One section of the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section heading.
    pub title: String,
    /// Section prose.
    pub content: String,
    /// Optional structured payload for the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Optional insight bullets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
}

/// Metadata accompanying a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Topic the session researched.
    pub research_topic: String,
    /// Number of workers requested.
    pub researcher_count: u32,
    /// Session duration, in seconds on the wire.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Total results collected.
    pub data_points: usize,
    /// Unique sources across all workers.
    pub sources: Vec<String>,
    /// Metrics snapshot.
    pub metrics: ResearchMetrics,
}

/// Final research report.
///
/// The assembler leaves `id`, `session_id`, and `created_at` at their
/// defaults; the orchestrator stamps them before persistence so assembly
/// stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report id.
    pub id: Uuid,
    /// Session that produced the report.
    pub session_id: String,
    /// Report title.
    pub title: String,
    /// Executive summary prose.
    #[serde(rename = "executive_summary")]
    pub executive: String,
    /// Ordered report sections.
    pub sections: Vec<ReportSection>,
    /// Methodology prose.
    pub methodology: String,
    /// Aggregated raw data.
    pub data: Map<String, Value>,
    /// Report metadata.
    pub metadata: ReportMetadata,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
