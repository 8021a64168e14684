//! Report pipeline: analysis, assembly, and Markdown rendering.
//!
//! The analyzer reduces raw worker results to metrics, statistics, and
//! patterns. The assembler is a pure function over `(config, results,
//! analysis)`; callers stamp ids and timestamps afterwards so the same
//! inputs always produce the same report.

pub mod analyzer;
pub mod assembler;
pub mod markdown;

pub use analyzer::{AnalysisType, DataAnalysisResponse, analyze_results, run_analysis};
pub use assembler::assemble_report;
pub use markdown::render_markdown;
