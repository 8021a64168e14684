//! Shared domain types for the widescreen research system.
//!
//! These types cross subsystem boundaries: the elicitation manager emits a
//! [`ResearchConfig`], workers publish [`WorkerResult`]s onto the bus, the
//! orchestrator tracks [`SessionStatus`] transitions, and the report
//! pipeline produces a [`Report`] wrapped in a [`ResearchResult`].

pub mod elicit;
pub mod report;
pub mod research;
pub mod result;
pub mod status;

pub use elicit::{ElicitationResponse, Question, QuestionKind, QuestionMeta, QuestionOption, ResponseKind};
pub use report::{DataAnalysis, Pattern, Report, ReportMetadata, ReportSection};
pub use research::{OutputFormat, PriorityLevel, ResearchConfig, ResearchDepth};
pub use result::{ResearchMetrics, ResearchResult, WorkerOutcome, WorkerResult};
pub use status::{SessionStatus, WorkerStatus};
