//! Worker results and session outcome payloads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::status::SessionStatus;

/// Terminal outcome a worker reports for its sub-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// The worker finished its sub-query.
    Completed,
    /// The worker gave up; `error` carries the reason.
    Failed,
}

/// Result message a worker publishes onto the bus.
///
/// Only the worker id and status are required on the wire; everything else
/// degrades to an empty value. `processing_time` accepts either integer
/// nanoseconds or a Go-style duration string (`"2.5s"`, `"1m30s"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    /// Id of the publishing worker.
    #[serde(rename = "drone_id")]
    pub worker_id: String,
    /// Completion status.
    pub status: WorkerOutcome,
    /// Free-form payload; the core only counts entries and extracts a
    /// `sources` string list when present.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Failure reason when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the worker finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// How long the worker spent on the sub-query.
    #[serde(
        default,
        deserialize_with = "deserialize_processing_time",
        serialize_with = "serialize_duration_nanos"
    )]
    pub processing_time: Duration,
}

impl WorkerResult {
    /// Number of data points in the payload.
    #[must_use]
    pub fn data_points(&self) -> usize {
        self.data.len()
    }

    /// Extracts the `sources` field as a string list, if present.
    #[must_use]
    pub fn sources(&self) -> Vec<&str> {
        self.data
            .get("sources")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Aggregate metrics for a research session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchMetrics {
    /// Workers successfully created.
    pub workers_provisioned: usize,
    /// Workers that reported `completed`.
    pub workers_completed: usize,
    /// Workers that reported `failed`.
    pub workers_failed: usize,
    /// Wall-clock duration of the session, in seconds on the wire.
    #[serde(
        serialize_with = "serialize_duration_secs",
        deserialize_with = "deserialize_duration_secs"
    )]
    pub total_duration: Duration,
    /// Total data points across all collected results.
    pub data_points_collected: usize,
    /// Rough compute cost estimate in USD.
    pub cost_estimate: f64,
}

/// Outcome of a research operation, returned to the MCP caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Session the result belongs to.
    pub session_id: String,
    /// Terminal session status.
    pub status: SessionStatus,
    /// Where the rendered report can be found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    /// Structured report payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<Value>,
    /// Session metrics, populated even on failure paths.
    pub metrics: ResearchMetrics,
    /// When the session reached its terminal state.
    pub completed_at: DateTime<Utc>,
}

fn serialize_duration_secs<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

fn deserialize_duration_secs<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(d)?;
    Ok(Duration::from_secs_f64(secs.max(0.0)))
}

fn serialize_duration_nanos<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u128(d.as_nanos())
}

/// Accepts integer/float nanoseconds or a Go-style duration string.
fn deserialize_processing_time<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(d)?;
    match value {
        Value::Null => Ok(Duration::ZERO),
        Value::Number(n) => {
            if let Some(nanos) = n.as_u64() {
                Ok(Duration::from_nanos(nanos))
            } else if let Some(nanos) = n.as_f64() {
                Ok(Duration::from_nanos(nanos.max(0.0) as u64))
            } else {
                Ok(Duration::ZERO)
            }
        }
        Value::String(s) => {
            parse_go_duration(&s).map_err(|e| serde::de::Error::custom(format!("{s:?}: {e}")))
        }
        other => Err(serde::de::Error::custom(format!(
            "processing_time must be a number or string, got {other}"
        ))),
    }
}

/// Parses a Go `time.Duration` string such as `"1m30s"` or `"2.5s"`.
fn parse_go_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() || s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| "missing unit".to_string())?;
        if digits_end == 0 {
            return Err(format!("expected number at {rest:?}"));
        }
        let number: f64 = rest[..digits_end]
            .parse()
            .map_err(|e| format!("bad number: {e}"))?;
        rest = &rest[digits_end..];

        let (unit_len, nanos_per_unit) = if rest.starts_with("ns") {
            (2, 1.0)
        } else if rest.starts_with("us") {
            (2, 1e3)
        } else if rest.starts_with("µs") {
            ("µs".len(), 1e3)
        } else if rest.starts_with("ms") {
            (2, 1e6)
        } else if rest.starts_with('s') {
            (1, 1e9)
        } else if rest.starts_with('m') {
            (1, 60.0 * 1e9)
        } else if rest.starts_with('h') {
            (1, 3600.0 * 1e9)
        } else {
            return Err(format!("unknown unit at {rest:?}"));
        };
        rest = &rest[unit_len..];

        total += Duration::from_nanos((number * nanos_per_unit) as u64);
    }

    Ok(total)
}
