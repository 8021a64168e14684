//! Per-session runtime state.
//!
//! A session is owned exclusively by the orchestrator from creation to
//! teardown. All mutation happens under one reader-writer lock; readers
//! take snapshots before doing network work so the lock is never held
//! across a call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::{Report, ResearchConfig, SessionStatus, WorkerResult, WorkerStatus};

/// Runtime data for one provisioned worker.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    /// Worker id, unique within the session.
    pub id: String,
    /// Externally reachable base URL.
    pub url: String,
    /// Current status.
    pub status: WorkerStatus,
    /// When provisioning completed.
    pub start_time: DateTime<Utc>,
    /// Last successful health check.
    pub last_checkin: DateTime<Utc>,
}

/// Mutable state of a research session.
#[derive(Debug)]
pub struct SessionState {
    /// The configuration the session was created with.
    pub config: ResearchConfig,
    /// Worker id → runtime info.
    pub workers: HashMap<String, WorkerInfo>,
    /// Worker ids in provisioning index order; dispatch assigns
    /// sub-queries positionally along this order.
    pub worker_order: Vec<String>,
    /// Current status. Mutate through [`SessionState::transition`].
    pub status: SessionStatus,
    /// When the session was allocated.
    pub start_time: DateTime<Utc>,
    /// Collected results, append-only in bus delivery order.
    pub results: Vec<WorkerResult>,
    /// Number of results that completes the session. Set after planning;
    /// may be lower than the requested researcher count when the planner
    /// under-delivers.
    pub target_results: usize,
    /// The final report, once assembled.
    pub report: Option<Report>,
}

/// Shared handle to a session.
pub type SharedSession = Arc<RwLock<SessionState>>;

impl SessionState {
    /// Allocates a fresh session in the `initializing` state.
    #[must_use]
    pub fn new(config: ResearchConfig) -> SharedSession {
        let target = config.researcher_count as usize;
        Arc::new(RwLock::new(Self {
            config,
            workers: HashMap::new(),
            worker_order: Vec::new(),
            status: SessionStatus::Initializing,
            start_time: Utc::now(),
            results: Vec::new(),
            target_results: target,
            report: None,
        }))
    }

    /// Applies a status transition. Terminal states are sticky; an attempt
    /// to leave one is ignored and reported as `false`.
    pub fn transition(&mut self, next: SessionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        true
    }

    /// Records a collected result and mirrors its outcome onto the worker.
    pub fn record_result(&mut self, result: WorkerResult) {
        if let Some(worker) = self.workers.get_mut(&result.worker_id) {
            worker.status = match result.status {
                crate::core::WorkerOutcome::Completed => WorkerStatus::Completed,
                crate::core::WorkerOutcome::Failed => WorkerStatus::Failed,
            };
            worker.last_checkin = Utc::now();
        }
        self.results.push(result);
    }

    /// Snapshot of `(id, url)` pairs in dispatch order.
    #[must_use]
    pub fn worker_endpoints(&self) -> Vec<(String, String)> {
        self.worker_order
            .iter()
            .filter_map(|id| {
                self.workers
                    .get(id)
                    .map(|w| (w.id.clone(), w.url.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkerOutcome;
    use crate::core::research::{OutputFormat, PriorityLevel, ResearchDepth};

    fn config() -> ResearchConfig {
        ResearchConfig {
            session_id: "s-1".to_string(),
            topic: "t".to_string(),
            researcher_count: 2,
            research_depth: ResearchDepth::Standard,
            output_format: OutputFormat::StructuredJson,
            timeout_minutes: 10,
            priority_level: PriorityLevel::Normal,
            workflow_templates: None,
            specific_sources: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_terminal_status_is_sticky() {
        let session = SessionState::new(config());
        let mut state = session.write().await;
        assert!(state.transition(SessionStatus::Running));
        assert!(state.transition(SessionStatus::Timeout));
        assert!(!state.transition(SessionStatus::Completed));
        assert_eq!(state.status, SessionStatus::Timeout);
    }

    #[tokio::test]
    async fn test_record_result_updates_worker() {
        let session = SessionState::new(config());
        let mut state = session.write().await;
        let now = Utc::now();
        state.worker_order.push("drone-s-1-0".to_string());
        state.workers.insert(
            "drone-s-1-0".to_string(),
            WorkerInfo {
                id: "drone-s-1-0".to_string(),
                url: "http://w0".to_string(),
                status: WorkerStatus::Running,
                start_time: now,
                last_checkin: now,
            },
        );

        state.record_result(WorkerResult {
            worker_id: "drone-s-1-0".to_string(),
            status: WorkerOutcome::Failed,
            data: serde_json::Map::new(),
            error: Some("boom".to_string()),
            completed_at: None,
            processing_time: std::time::Duration::ZERO,
        });

        assert_eq!(state.results.len(), 1);
        assert_eq!(
            state.workers["drone-s-1-0"].status,
            WorkerStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_worker_result_still_recorded() {
        let session = SessionState::new(config());
        let mut state = session.write().await;
        state.record_result(WorkerResult {
            worker_id: "stranger".to_string(),
            status: WorkerOutcome::Completed,
            data: serde_json::Map::new(),
            error: None,
            completed_at: None,
            processing_time: std::time::Duration::ZERO,
        });
        assert_eq!(state.results.len(), 1);
    }
}
