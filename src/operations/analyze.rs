//! Analyze-findings operation.
//!
//! Thin envelope over the report analyzer for caller-supplied results.

use serde::Deserialize;

use crate::core::WorkerResult;
use crate::error::OrchestratorError;
use crate::report::{AnalysisType, DataAnalysisResponse, run_analysis};

/// Parameters of the `analyze-findings` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeParams {
    /// Worker results to analyze.
    pub data: Vec<WorkerResult>,
    /// Analysis flavor string; unknown values fall back to comprehensive.
    #[serde(default)]
    pub analysis_type: Option<String>,
}

/// Runs the requested analysis.
///
/// # Errors
///
/// Returns [`OrchestratorError::Validation`] when no data was supplied.
pub fn run(params: &AnalyzeParams) -> Result<DataAnalysisResponse, OrchestratorError> {
    if params.data.is_empty() {
        return Err(OrchestratorError::Validation {
            message: "no data provided for analysis".to_string(),
        });
    }

    let kind = params
        .analysis_type
        .as_deref()
        .map_or(AnalysisType::Comprehensive, AnalysisType::parse);
    Ok(run_analysis(&params.data, kind))
}
