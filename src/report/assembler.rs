//! Report assembly.
//!
//! A pure function of `(config, results, analysis)`. No clock reads, no
//! randomness: the orchestrator stamps the report id, session id, and
//! creation time after assembly, which keeps the assembly itself
//! byte-for-byte reproducible.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::core::research::ResearchDepth;
use crate::core::{
    DataAnalysis, Report, ReportMetadata, ReportSection, ResearchConfig, WorkerOutcome,
    WorkerResult,
};

/// Builds the structured report from collected results and their analysis.
#[must_use]
pub fn assemble_report(
    config: &ResearchConfig,
    results: &[WorkerResult],
    analysis: &DataAnalysis,
) -> Report {
    Report {
        id: Uuid::nil(),
        session_id: String::new(),
        title: format!("Research Report: {}", config.topic),
        executive: executive_summary(config, analysis),
        sections: sections(config, results, analysis),
        methodology: methodology(config),
        data: aggregate_data(results),
        metadata: ReportMetadata {
            research_topic: config.topic.clone(),
            researcher_count: config.researcher_count,
            duration: analysis.duration,
            data_points: results.len(),
            sources: unique_sources(results),
            metrics: analysis.metrics.clone(),
        },
        created_at: DateTime::<Utc>::MIN_UTC,
    }
}

fn executive_summary(config: &ResearchConfig, analysis: &DataAnalysis) -> String {
    let mut summary = format!("Executive Summary: {}\n\n", config.topic);
    summary.push_str(&format!(
        "This research was conducted using {} parallel research drones over {}.\n\n",
        config.researcher_count,
        format_duration(analysis.duration)
    ));

    summary.push_str("Key Findings:\n");
    for insight in analysis.top_insights.iter().take(3) {
        summary.push_str(&format!("- {insight}\n"));
    }
    summary
}

fn sections(
    config: &ResearchConfig,
    results: &[WorkerResult],
    analysis: &DataAnalysis,
) -> Vec<ReportSection> {
    vec![
        ReportSection {
            title: "Introduction".to_string(),
            content: introduction(config),
            data: None,
            insights: Vec::new(),
        },
        ReportSection {
            title: "Key Findings".to_string(),
            content: key_findings(results, analysis),
            data: None,
            insights: analysis.top_insights.clone(),
        },
        ReportSection {
            title: "Data Analysis".to_string(),
            content: data_analysis_prose(analysis),
            data: Some(analysis.statistics.clone()),
            insights: Vec::new(),
        },
        ReportSection {
            title: "Conclusions".to_string(),
            content: conclusions(config, analysis),
            data: None,
            insights: Vec::new(),
        },
    ]
}

fn introduction(config: &ResearchConfig) -> String {
    format!(
        "This report presents the findings from a comprehensive research study on '{}'. \
         The research was conducted using {} parallel research agents with a {} depth \
         approach.",
        config.topic,
        config.researcher_count,
        config.research_depth.as_str()
    )
}

fn key_findings(results: &[WorkerResult], analysis: &DataAnalysis) -> String {
    let successful = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .count();

    let mut findings = "Based on the analysis of data from all research drones, the \
                        following key findings emerged:\n\n"
        .to_string();
    findings.push_str(&format!(
        "- Successfully collected data from {successful} out of {} drones\n",
        results.len()
    ));
    findings.push_str(&format!(
        "- Identified {} key patterns across the dataset\n",
        analysis.patterns.len()
    ));
    findings
}

fn data_analysis_prose(analysis: &DataAnalysis) -> String {
    let total_points = analysis
        .statistics
        .get("total_data_points")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    format!(
        "The data analysis revealed {} patterns with an average confidence of {:.2}. \
         Statistical analysis shows {total_points} unique data points collected.",
        analysis.patterns.len(),
        analysis.average_confidence
    )
}

fn conclusions(config: &ResearchConfig, analysis: &DataAnalysis) -> String {
    format!(
        "The research on '{}' has provided comprehensive insights through parallel \
         processing. The {}-depth analysis approach yielded {} actionable insights with \
         high confidence.",
        config.topic,
        config.research_depth.as_str(),
        analysis.top_insights.len()
    )
}

fn methodology(config: &ResearchConfig) -> String {
    let mut prose = format!(
        "This research employed a distributed approach using {} parallel research drones. \
         Each drone was tasked with specific aspects of the research topic '{}'.\n\n",
        config.researcher_count, config.topic
    );

    match config.research_depth {
        ResearchDepth::Basic => {
            prose.push_str("- Quick overview using web search and summary extraction\n");
            prose.push_str("- Focus on recent and relevant information\n");
            prose.push_str("- Basic fact verification\n");
        }
        ResearchDepth::Standard => {
            prose.push_str("- Standard research approach with balanced depth\n");
            prose.push_str("- Multiple source verification\n");
            prose.push_str("- Pattern identification and analysis\n");
        }
        ResearchDepth::Deep => {
            prose.push_str("- Comprehensive investigation across multiple sources\n");
            prose.push_str("- Cross-reference verification of all findings\n");
            prose.push_str("- Deep analysis of patterns and relationships\n");
            prose.push_str("- Expert source consultation\n");
        }
    }
    prose
}

fn aggregate_data(results: &[WorkerResult]) -> Map<String, Value> {
    let successful: Vec<Value> = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .map(|r| Value::Object(r.data.clone()))
        .collect();

    let mut aggregated = Map::new();
    aggregated.insert(
        "successful_results".to_string(),
        json!(successful.len()),
    );
    aggregated.insert("total_results".to_string(), json!(results.len()));
    aggregated.insert("drone_data".to_string(), Value::Array(successful));
    aggregated
}

/// Unique sources across all workers, sorted for stable output.
fn unique_sources(results: &[WorkerResult]) -> Vec<String> {
    let set: BTreeSet<String> = results
        .iter()
        .flat_map(|r| r.sources().into_iter().map(str::to_string))
        .collect();
    set.into_iter().collect()
}

/// Go-style duration rendering (`10m0s`, `1h2m3s`, `45s`).
fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
