//! Session and worker status state machines.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a research session.
///
/// `initializing → running → (completed | failed | timeout |
/// failed_report_generation)`. Terminal states are sticky: once a session
/// reaches one, further transitions are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session allocated, nothing provisioned yet.
    Initializing,
    /// Workers provisioned and collecting results.
    Running,
    /// All expected results arrived and the report was produced.
    Completed,
    /// The pipeline failed before completion.
    Failed,
    /// The wall-clock budget expired.
    Timeout,
    /// Results arrived but report assembly or persistence failed.
    FailedReportGeneration,
}

impl SessionStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Timeout | Self::FailedReportGeneration
        )
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::FailedReportGeneration => "failed_report_generation",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime status of a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Creation requested at the host.
    Provisioning,
    /// Reachable at its URL.
    Deployed,
    /// Instruction accepted, researching.
    Running,
    /// Health probe failed.
    Unhealthy,
    /// Instruction dispatch failed; the worker can never complete.
    FailedToInstruct,
    /// Published a `completed` result.
    Completed,
    /// Published a `failed` result.
    Failed,
    /// Deleted during cleanup.
    Terminated,
}

impl WorkerStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Deployed => "deployed",
            Self::Running => "running",
            Self::Unhealthy => "unhealthy",
            Self::FailedToInstruct => "failed_to_instruct",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
