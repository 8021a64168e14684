//! Analysis of collected worker results.
//!
//! Computes completion metrics, statistics, and patterns from a result
//! set. Duplicate results (same worker id) are tolerated: everything here
//! counts results, not workers, except the explicit worker tallies fed in
//! by the caller.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::{DataAnalysis, Pattern, ResearchMetrics, WorkerOutcome, WorkerResult};

/// How many insights the analysis keeps.
const TOP_INSIGHT_COUNT: usize = 3;

/// Analysis flavor for the `analyze-findings` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Everything: summary, insights, patterns, statistics.
    #[default]
    Comprehensive,
    /// Statistics with a thin summary.
    Statistical,
    /// Patterns with derived insights.
    Pattern,
    /// Prose summary plus top insights.
    Summary,
}

impl AnalysisType {
    /// Parses an analysis type, defaulting to comprehensive.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "statistical" => Self::Statistical,
            "pattern" => Self::Pattern,
            "summary" => Self::Summary,
            _ => Self::Comprehensive,
        }
    }
}

/// Response payload of the `analyze-findings` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataAnalysisResponse {
    /// Prose summary of the result set.
    pub summary: String,
    /// Derived insight bullets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
    /// Discovered patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<Pattern>,
    /// Statistics blob.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub statistics: Map<String, Value>,
}

/// Full analysis for the report pipeline.
///
/// `provisioned` is the number of workers actually created; `duration`
/// is stamped by the caller so this function stays clock-free.
#[must_use]
pub fn analyze_results(
    results: &[WorkerResult],
    duration: Duration,
    provisioned: usize,
) -> DataAnalysis {
    let metrics = calculate_metrics(results, duration, provisioned);
    let patterns = extract_patterns(results);

    let average_confidence = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64
    };

    DataAnalysis {
        top_insights: top_insights(&patterns, results),
        statistics: calculate_statistics(results),
        duration,
        average_confidence,
        metrics,
        patterns,
    }
}

/// Runs the selected analysis flavor over caller-supplied results.
#[must_use]
pub fn run_analysis(results: &[WorkerResult], kind: AnalysisType) -> DataAnalysisResponse {
    match kind {
        AnalysisType::Comprehensive => DataAnalysisResponse {
            summary: summary_line(results),
            insights: base_insights(results),
            patterns: extract_patterns(results),
            statistics: calculate_statistics(results),
        },
        AnalysisType::Statistical => {
            let statistics = detailed_statistics(results);
            let success_rate = statistics
                .get("success_rate")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            let avg_time = statistics
                .get("avg_processing_time")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            DataAnalysisResponse {
                summary: "Statistical analysis of research data".to_string(),
                insights: vec![
                    format!("Total data points analyzed: {}", results.len()),
                    format!("Success rate: {:.2}%", success_rate * 100.0),
                    format!("Average processing time: {avg_time:.2} seconds"),
                ],
                patterns: Vec::new(),
                statistics,
            }
        }
        AnalysisType::Pattern => {
            let patterns = extract_patterns(results);
            let insights = patterns
                .iter()
                .map(|p| {
                    format!(
                        "{}: {} (confidence: {:.2}%)",
                        p.name,
                        p.description,
                        p.confidence * 100.0
                    )
                })
                .collect();
            DataAnalysisResponse {
                summary: "Pattern analysis of research data".to_string(),
                insights,
                patterns,
                statistics: Map::new(),
            }
        }
        AnalysisType::Summary => DataAnalysisResponse {
            summary: detailed_summary(results),
            insights: base_insights(results),
            patterns: Vec::new(),
            statistics: Map::new(),
        },
    }
}

/// Session metrics including the rough cost estimate.
#[must_use]
pub fn calculate_metrics(
    results: &[WorkerResult],
    duration: Duration,
    provisioned: usize,
) -> ResearchMetrics {
    let mut metrics = ResearchMetrics {
        workers_provisioned: provisioned,
        total_duration: duration,
        ..ResearchMetrics::default()
    };

    for result in results {
        match result.status {
            WorkerOutcome::Completed => {
                metrics.workers_completed += 1;
                metrics.data_points_collected += result.data_points();
            }
            WorkerOutcome::Failed => metrics.workers_failed += 1,
        }
    }

    // Rough estimate from compute-hours; anything finer is a non-goal.
    let cpu_hours = provisioned as f64 * duration.as_secs_f64() / 3600.0;
    metrics.cost_estimate = cpu_hours * 0.0000024 * 1000.0;

    metrics
}

fn count_successful(results: &[WorkerResult]) -> usize {
    results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .count()
}

fn completion_rate(results: &[WorkerResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    count_successful(results) as f64 / results.len() as f64
}

/// Quality score in 0..=10 from completeness and error rate.
fn data_quality(results: &[WorkerResult]) -> f64 {
    let mut total = 0.0;
    let mut valid = 0usize;
    for result in results {
        if result.status == WorkerOutcome::Completed && !result.data.is_empty() {
            let mut score = 10.0;
            if result.data_points() < 5 {
                score -= 2.0;
            }
            if result.error.is_some() {
                score -= 3.0;
            }
            total += score;
            valid += 1;
        }
    }
    if valid == 0 { 0.0 } else { total / valid as f64 }
}

/// Sources ranked by frequency, ties broken by name for determinism.
fn top_sources(results: &[WorkerResult]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for result in results {
        for source in result.sources() {
            *counts.entry(source).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(5)
        .map(|(s, _)| s.to_string())
        .collect()
}

fn processing_times(results: &[WorkerResult]) -> (Duration, Duration, Duration) {
    let times: Vec<Duration> = results
        .iter()
        .map(|r| r.processing_time)
        .filter(|t| !t.is_zero())
        .collect();
    if times.is_empty() {
        return (Duration::ZERO, Duration::ZERO, Duration::ZERO);
    }

    let min = times.iter().min().copied().unwrap_or_default();
    let max = times.iter().max().copied().unwrap_or_default();
    let total: Duration = times.iter().sum();
    (total / times.len() as u32, min, max)
}

fn base_insights(results: &[WorkerResult]) -> Vec<String> {
    let mut insights = vec![
        format!(
            "Research completion rate: {:.2}%",
            completion_rate(results) * 100.0
        ),
        format!("Data quality score: {:.2}/10", data_quality(results)),
    ];

    let sources = top_sources(results);
    if !sources.is_empty() {
        let shown = sources.iter().take(3).cloned().collect::<Vec<_>>();
        insights.push(format!("Top data sources: {}", shown.join(", ")));
    }

    let (avg, min, max) = processing_times(results);
    insights.push(format!(
        "Processing times - Avg: {:.2}s, Min: {:.2}s, Max: {:.2}s",
        avg.as_secs_f64(),
        min.as_secs_f64(),
        max.as_secs_f64()
    ));

    insights
}

/// The highest-confidence insights, best first.
fn top_insights(patterns: &[Pattern], results: &[WorkerResult]) -> Vec<String> {
    let mut ranked: Vec<&Pattern> = patterns.iter().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut insights: Vec<String> = ranked
        .iter()
        .map(|p| {
            format!(
                "{}: {} (confidence: {:.2}%)",
                p.name,
                p.description,
                p.confidence * 100.0
            )
        })
        .collect();

    let total_points: usize = results.iter().map(WorkerResult::data_points).sum();
    insights.push(format!(
        "Research completed with {total_points} data points collected"
    ));
    insights.truncate(TOP_INSIGHT_COUNT);
    insights
}

fn summary_line(results: &[WorkerResult]) -> String {
    let successful = count_successful(results);
    let total_points: usize = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .map(WorkerResult::data_points)
        .sum();
    format!(
        "Analysis of {} research results: {successful} successful completions with \
         {total_points} total data points collected",
        results.len()
    )
}

fn detailed_summary(results: &[WorkerResult]) -> String {
    let mut summary = summary_line(results);
    summary.push_str("\n\nDetailed Analysis:\n");
    summary.push_str(&format!(
        "- Completion rate: {:.2}%\n",
        completion_rate(results) * 100.0
    ));
    summary.push_str(&format!(
        "- Data quality score: {:.2}/10\n",
        data_quality(results)
    ));

    let (avg, min, max) = processing_times(results);
    summary.push_str(&format!(
        "- Processing times: avg={:.2}s, min={:.2}s, max={:.2}s\n",
        avg.as_secs_f64(),
        min.as_secs_f64(),
        max.as_secs_f64()
    ));

    let sources = top_sources(results);
    if !sources.is_empty() {
        summary.push_str(&format!("- Top sources: {}\n", sources.join(", ")));
    }
    summary
}

/// All pattern detectors over the result set.
#[must_use]
pub fn extract_patterns(results: &[WorkerResult]) -> Vec<Pattern> {
    [
        completion_pattern(results),
        data_volume_pattern(results),
        error_pattern(results),
        source_diversity_pattern(results),
        time_of_day_pattern(results),
        performance_pattern(results),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn completion_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let rate = completion_rate(results);
    if rate > 0.9 {
        Some(Pattern {
            name: "High Success Rate".to_string(),
            description: "Research drones achieved exceptional completion rate".to_string(),
            frequency: count_successful(results),
            confidence: rate,
        })
    } else if rate < 0.5 && !results.is_empty() {
        Some(Pattern {
            name: "Low Success Rate".to_string(),
            description: "Research drones experienced significant failure rate".to_string(),
            frequency: results.len() - count_successful(results),
            confidence: 1.0 - rate,
        })
    } else {
        None
    }
}

fn data_volume_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let volumes: Vec<usize> = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .map(WorkerResult::data_points)
        .collect();
    if volumes.is_empty() {
        return None;
    }

    let avg = volumes.iter().sum::<usize>() as f64 / volumes.len() as f64;
    let variance = volumes
        .iter()
        .map(|&v| (v as f64 - avg).powi(2))
        .sum::<f64>()
        / volumes.len() as f64;

    (variance < avg * 0.1).then(|| Pattern {
        name: "Consistent Data Volume".to_string(),
        description: "Research drones collected similar amounts of data".to_string(),
        frequency: volumes.len(),
        confidence: 0.85,
    })
}

fn error_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let mut error_types: HashMap<&str, usize> = HashMap::new();
    for result in results {
        if let Some(error) = &result.error {
            let lowered = error.to_lowercase();
            let kind = if lowered.contains("timeout") {
                "timeout"
            } else if lowered.contains("connection") {
                "connection"
            } else {
                "other"
            };
            *error_types.entry(kind).or_default() += 1;
        }
    }

    let (kind, count) = error_types
        .into_iter()
        .max_by_key(|&(kind, count)| (count, std::cmp::Reverse(kind)))?;
    if count <= results.len() / 10 {
        return None;
    }

    let mut label = kind.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Some(Pattern {
        name: format!("Recurring {label} Errors"),
        description: format!("Multiple drones experienced {kind} errors"),
        frequency: count,
        confidence: count as f64 / results.len() as f64,
    })
}

fn source_diversity_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let mut unique = std::collections::HashSet::new();
    let mut total = 0usize;
    for result in results {
        for source in result.sources() {
            unique.insert(source.to_string());
            total += 1;
        }
    }
    if total == 0 {
        return None;
    }

    let ratio = unique.len() as f64 / total as f64;
    if ratio > 0.7 {
        Some(Pattern {
            name: "High Source Diversity".to_string(),
            description: "Research covered a wide variety of sources".to_string(),
            frequency: unique.len(),
            confidence: ratio,
        })
    } else if ratio < 0.3 {
        Some(Pattern {
            name: "Source Concentration".to_string(),
            description: "Research focused on a limited set of sources".to_string(),
            frequency: total,
            confidence: 1.0 - ratio,
        })
    } else {
        None
    }
}

fn time_of_day_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let mut hour_counts: HashMap<u32, usize> = HashMap::new();
    for result in results {
        if let Some(completed_at) = result.completed_at {
            *hour_counts.entry(completed_at.hour()).or_default() += 1;
        }
    }

    let (hour, count) = hour_counts
        .into_iter()
        .max_by_key(|&(hour, count)| (count, std::cmp::Reverse(hour)))?;
    if count <= results.len() / 4 {
        return None;
    }

    Some(Pattern {
        name: format!("Peak Activity at {hour:02}:00"),
        description: "Research activity concentrated during specific time period".to_string(),
        frequency: count,
        confidence: count as f64 / results.len() as f64,
    })
}

fn performance_pattern(results: &[WorkerResult]) -> Option<Pattern> {
    let (avg, _, max) = processing_times(results);
    if avg.is_zero() || max <= avg * 3 {
        return None;
    }
    Some(Pattern {
        name: "Performance Variance".to_string(),
        description: "Significant variation in drone processing times detected".to_string(),
        frequency: results.len(),
        confidence: 0.75,
    })
}

/// Basic statistics blob.
#[must_use]
pub fn calculate_statistics(results: &[WorkerResult]) -> Map<String, Value> {
    let mut stats = Map::new();
    let successful = count_successful(results);

    stats.insert("total_results".to_string(), json!(results.len()));
    stats.insert("successful_results".to_string(), json!(successful));
    stats.insert(
        "failed_results".to_string(),
        json!(results.len() - successful),
    );
    stats.insert(
        "success_rate".to_string(),
        json!(completion_rate(results)),
    );

    let volumes: Vec<usize> = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .map(WorkerResult::data_points)
        .collect();
    let total_points: usize = volumes.iter().sum();
    stats.insert("total_data_points".to_string(), json!(total_points));
    let avg_points = if volumes.is_empty() {
        0.0
    } else {
        total_points as f64 / volumes.len() as f64
    };
    stats.insert("avg_data_points_per_drone".to_string(), json!(avg_points));

    let (avg, _, _) = processing_times(results);
    stats.insert(
        "avg_processing_time".to_string(),
        json!(avg.as_secs_f64()),
    );

    stats
}

fn detailed_statistics(results: &[WorkerResult]) -> Map<String, Value> {
    let mut stats = calculate_statistics(results);
    let success_rate = stats
        .get("success_rate")
        .and_then(Value::as_f64)
        .unwrap_or_default();
    stats.insert("error_rate".to_string(), json!(1.0 - success_rate));

    let mut volumes: Vec<usize> = results
        .iter()
        .filter(|r| r.status == WorkerOutcome::Completed)
        .map(WorkerResult::data_points)
        .collect();
    if !volumes.is_empty() {
        volumes.sort_unstable();
        stats.insert("data_volume_p50".to_string(), json!(volumes[volumes.len() / 2]));
        let p90 = volumes[((volumes.len() as f64 * 0.9) as usize).min(volumes.len() - 1)];
        stats.insert("data_volume_p90".to_string(), json!(p90));
        stats.insert("data_volume_min".to_string(), json!(volumes[0]));
        stats.insert(
            "data_volume_max".to_string(),
            json!(volumes[volumes.len() - 1]),
        );
    }

    stats
}
