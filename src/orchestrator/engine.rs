//! Session lifecycle engine.
//!
//! Two entry points: [`Orchestrator::run_research`] drives the full
//! fleet-based pipeline (plan → provision → dispatch → collect → wait →
//! assemble → cleanup), and [`Orchestrator::run_websets_pipeline`] drives
//! the subprocess-MCP pipeline (create → poll → list → publish).
//!
//! Failure policy: validation errors surface to the caller before a
//! session exists; everything after session creation resolves into a
//! [`ResearchResult`] whose status is `failed`, `timeout`, or
//! `failed_report_generation`, with whatever metrics were accumulated.
//! Cleanup always runs and is best-effort.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::core::{ResearchConfig, ResearchMetrics, ResearchResult, SessionStatus, WorkerStatus};
use crate::error::OrchestratorError;
use crate::hosting::{DocumentStore, MessageBus, WorkerHost};
use crate::report::{analyze_results, assemble_report, render_markdown};
use crate::websets::{WebsetsClient, WebsetsOperations};

use super::artifacts::ArtifactWriter;
use super::dispatch::{InstructionClient, spawn_health_probe};
use super::planner::SubQueryPlanner;
use super::provisioner::{FleetProvisioner, results_topic};
use super::queue::ResultQueue;
use super::session::{SessionState, SharedSession};

/// Document store collection holding completed reports.
const REPORT_COLLECTION: &str = "research_reports";

/// Timing knobs for the engine's polling loops.
///
/// Production uses the defaults; tests shrink the intervals and pin the
/// session deadline.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Completion poll interval for the wait loop.
    pub wait_poll: Duration,
    /// Overrides the session deadline derived from the config.
    pub timeout_override: Option<Duration>,
    /// Status poll interval for the websets pipeline.
    pub websets_poll: Duration,
    /// Overall deadline for the websets pipeline.
    pub websets_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_poll: Duration::from_secs(5),
            timeout_override: None,
            websets_poll: Duration::from_secs(10),
            websets_timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// External collaborators the engine drives.
pub struct Collaborators {
    /// Compute backend for workers.
    pub host: Arc<dyn WorkerHost>,
    /// Pub/sub transport for results.
    pub bus: Arc<dyn MessageBus>,
    /// Report persistence.
    pub store: Arc<dyn DocumentStore>,
    /// Sub-query planner.
    pub planner: Arc<dyn SubQueryPlanner>,
    /// Subprocess MCP client for websets.
    pub websets: Arc<dyn WebsetsClient>,
}

/// The research orchestrator.
pub struct Orchestrator {
    settings: Settings,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn DocumentStore>,
    planner: Arc<dyn SubQueryPlanner>,
    websets: Arc<dyn WebsetsClient>,
    provisioner: FleetProvisioner,
    artifacts: ArtifactWriter,
    http: InstructionClient,
    sessions: RwLock<HashMap<String, SharedSession>>,
    timing: Timing,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator over the given collaborators. `cancel` is
    /// the root token; cancelling it stops every session's tasks.
    #[must_use]
    pub fn new(settings: Settings, deps: Collaborators, cancel: CancellationToken) -> Self {
        let provisioner = FleetProvisioner::new(
            deps.host,
            settings.worker_image.clone(),
            settings.region.clone(),
        );
        let artifacts = ArtifactWriter::new(settings.reports_dir.clone());
        Self {
            settings,
            bus: deps.bus,
            store: deps.store,
            planner: deps.planner,
            websets: deps.websets,
            provisioner,
            artifacts,
            http: InstructionClient::new(),
            sessions: RwLock::new(HashMap::new()),
            timing: Timing::default(),
            cancel,
        }
    }

    /// Replaces the timing knobs. A tuning and test seam.
    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// The server settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The worker host, for the provisioning operation.
    #[must_use]
    pub fn host(&self) -> Arc<dyn WorkerHost> {
        Arc::clone(self.provisioner.host())
    }

    /// The message bus, for the provisioning operation.
    #[must_use]
    pub fn bus(&self) -> Arc<dyn MessageBus> {
        Arc::clone(&self.bus)
    }

    /// The websets client, for direct pass-through calls.
    #[must_use]
    pub fn websets_client(&self) -> Arc<dyn WebsetsClient> {
        Arc::clone(&self.websets)
    }

    /// Number of live sessions.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Runs the fleet-based research pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] for an invalid config.
    /// Pipeline failures after the session exists resolve into the
    /// returned payload's status instead.
    pub async fn run_research(
        &self,
        config: ResearchConfig,
    ) -> Result<ResearchResult, OrchestratorError> {
        config.validate()?;

        let session_id = config.session_id.clone();
        let session = SessionState::new(config);
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::clone(&session));
        self.write_progress(&session).await;

        let queue = ResultQueue::new(&session_id);
        let session_cancel = self.cancel.child_token();

        let outcome = self.execute(&session, &queue, &session_cancel).await;
        if let Err(e) = outcome {
            let terminal = match &e {
                OrchestratorError::Timeout { .. } => SessionStatus::Timeout,
                OrchestratorError::Report { .. } => SessionStatus::FailedReportGeneration,
                _ => SessionStatus::Failed,
            };
            warn!(%session_id, error = %e, "research session failed");
            session.write().await.transition(terminal);

            // Whatever was collected before the failure is still worth
            // keeping as raw artifacts.
            let results = session.read().await.results.clone();
            if !results.is_empty()
                && let Err(e) = self
                    .artifacts
                    .write_worker_results(&session_id, &results)
                    .await
            {
                warn!(%session_id, error = %e, "failed to save partial results");
            }
        }
        self.write_progress(&session).await;

        session_cancel.cancel();
        self.cleanup(&session, &queue).await;

        let state = session.read().await;
        let duration = (Utc::now() - state.start_time).to_std().unwrap_or_default();
        let metrics = crate::report::analyzer::calculate_metrics(
            &state.results,
            duration,
            state.workers.len(),
        );
        let (report_url, report_data) = match &state.report {
            Some(report) => (
                Some(format!("/reports/{}", report.id)),
                serde_json::to_value(report).ok(),
            ),
            None => (None, None),
        };

        Ok(ResearchResult {
            session_id,
            status: state.status,
            report_url,
            report_data,
            metrics,
            completed_at: Utc::now(),
        })
    }

    /// The pipeline body; every error is resolved into a terminal status
    /// by the caller.
    async fn execute(
        &self,
        session: &SharedSession,
        queue: &Arc<ResultQueue>,
        cancel: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let config = session.read().await.config.clone();
        let requested = config.researcher_count as usize;

        // Plan before provisioning so an under-delivering planner shrinks
        // the fleet instead of stranding idle workers.
        let mut sub_queries = self.planner.plan(&config.topic, requested).await?;
        if sub_queries.len() > requested {
            warn!(
                session_id = %config.session_id,
                planned = sub_queries.len(),
                requested,
                "planner over-delivered; truncating sub-queries"
            );
            sub_queries.truncate(requested);
        } else if sub_queries.len() < requested {
            warn!(
                session_id = %config.session_id,
                planned = sub_queries.len(),
                requested,
                "planner under-delivered; reducing fleet"
            );
        }
        if sub_queries.is_empty() {
            return Err(OrchestratorError::Planner {
                message: "planner returned no sub-queries".to_string(),
            });
        }
        let effective = sub_queries.len();
        session.write().await.target_results = effective;

        info!(
            session_id = %config.session_id,
            workers = effective,
            "provisioning research workers"
        );
        self.provisioner.provision(session, effective).await?;
        session.write().await.transition(SessionStatus::Running);
        self.write_progress(session).await;

        // Result collection must be live before any worker is instructed.
        queue.subscribe(self.bus.as_ref()).await?;
        if let (Some(result_rx), Some(error_rx)) =
            (queue.take_result_channel(), queue.take_error_channel())
        {
            tokio::spawn(collect_results(
                Arc::clone(session),
                result_rx,
                error_rx,
                self.artifacts.clone(),
                cancel.child_token(),
            ));
        }

        // Sub-queries are assigned positionally along the provisioning
        // order. Dispatch failures are per-worker and non-fatal.
        let endpoints = session.read().await.worker_endpoints();
        for (index, (worker_id, url)) in endpoints.iter().enumerate() {
            let subject = &sub_queries[index];
            match self
                .http
                .send_instruction(url, subject, &config.session_id)
                .await
            {
                Ok(()) => {
                    let mut state = session.write().await;
                    if let Some(worker) = state.workers.get_mut(worker_id) {
                        worker.status = WorkerStatus::Running;
                    }
                }
                Err(e) => {
                    warn!(%worker_id, error = %e, "failed to send instructions");
                    let mut state = session.write().await;
                    if let Some(worker) = state.workers.get_mut(worker_id) {
                        worker.status = WorkerStatus::FailedToInstruct;
                    }
                }
            }
        }
        self.write_progress(session).await;

        spawn_health_probe(self.http.clone(), Arc::clone(session), cancel.child_token());

        self.wait_for_completion(session, &config, cancel).await?;
        self.assemble(session, &config).await?;
        session.write().await.transition(SessionStatus::Completed);
        Ok(())
    }

    async fn wait_for_completion(
        &self,
        session: &SharedSession,
        config: &ResearchConfig,
        cancel: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let deadline = self.timing.timeout_override.unwrap_or_else(|| {
            Duration::from_secs(u64::from(config.timeout_minutes) * 60)
        });
        let started = tokio::time::Instant::now();
        let mut ticker = tokio::time::interval(self.timing.wait_poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                _ = ticker.tick() => {}
            }

            let (collected, target) = {
                let state = session.read().await;
                (state.results.len(), state.target_results)
            };

            if collected >= target {
                info!(
                    session_id = %config.session_id,
                    target,
                    "all workers completed"
                );
                return Ok(());
            }

            if started.elapsed() >= deadline {
                return Err(OrchestratorError::Timeout {
                    minutes: config.timeout_minutes,
                });
            }

            debug!(
                session_id = %config.session_id,
                collected,
                target,
                "research progress"
            );
        }
    }

    async fn assemble(
        &self,
        session: &SharedSession,
        config: &ResearchConfig,
    ) -> Result<(), OrchestratorError> {
        let report_err = |message: String| OrchestratorError::Report { message };

        let (results, start_time, provisioned) = {
            let state = session.read().await;
            (
                state.results.clone(),
                state.start_time,
                state.workers.len(),
            )
        };

        let duration = (Utc::now() - start_time).to_std().unwrap_or_default();
        let analysis = analyze_results(&results, duration, provisioned);

        let mut report = assemble_report(config, &results, &analysis);
        report.id = Uuid::new_v4();
        report.session_id = config.session_id.clone();
        report.created_at = Utc::now();

        let result_files = self
            .artifacts
            .write_worker_results(&config.session_id, &results)
            .await
            .map_err(|e| report_err(format!("failed to write worker results: {e}")))?;

        let markdown = render_markdown(&report, &result_files);
        self.artifacts
            .write_report_markdown(&config.session_id, &markdown)
            .await
            .map_err(|e| report_err(format!("failed to write report: {e}")))?;

        let document = serde_json::to_value(&report)
            .map_err(|e| report_err(format!("failed to serialize report: {e}")))?;
        if let Err(e) = self
            .store
            .put(REPORT_COLLECTION, &report.id.to_string(), &document)
            .await
        {
            // Artifacts already exist on disk; losing the store copy is
            // not worth failing the session.
            warn!(error = %e, "failed to store report");
        }

        info!(
            session_id = %config.session_id,
            report_id = %report.id,
            "report generated"
        );
        session.write().await.report = Some(report);
        Ok(())
    }

    /// Best-effort resource teardown. Deletes every provisioned worker
    /// exactly once, removes the session topic, closes the queue, and
    /// drops the session from the live map. Failures are logged, never
    /// re-raised.
    async fn cleanup(&self, session: &SharedSession, queue: &Arc<ResultQueue>) {
        let session_id = session.read().await.config.session_id.clone();
        info!(%session_id, "cleaning up session");

        self.provisioner.teardown(session).await;

        if let Err(e) = self.bus.delete_topic(&results_topic(&session_id)).await {
            warn!(%session_id, error = %e, "failed to delete results topic");
        }

        queue.close();
        self.sessions.write().await.remove(&session_id);
    }

    async fn write_progress(&self, session: &SharedSession) {
        let state = session.read().await;
        if let Err(e) = self.artifacts.write_progress(&state).await {
            warn!(
                session_id = %state.config.session_id,
                error = %e,
                "failed to update progress file"
            );
        }
    }

    /// Runs the websets pipeline: create the webset, poll until complete,
    /// list its items, publish each onto `websets-<webset_id>`, and wrap
    /// everything as a single-worker-equivalent result.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the pipeline; no items are published on
    /// the failure paths.
    pub async fn run_websets_pipeline(
        &self,
        topic: &str,
        result_count: usize,
    ) -> Result<ResearchResult, OrchestratorError> {
        if topic.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                message: "topic parameter is required".to_string(),
            });
        }

        let started = Utc::now();
        let ops = WebsetsOperations::new(self.websets_client());

        let webset_id = ops.create_webset(topic, result_count).await?;
        info!(%webset_id, topic, "webset created");

        ops.wait_for_completion_with(
            &webset_id,
            self.timing.websets_timeout,
            self.timing.websets_poll,
        )
        .await?;

        let items = ops.list_content_items(&webset_id, result_count).await?;
        info!(%webset_id, items = items.len(), "webset items listed");

        let topic_name = format!("websets-{webset_id}");
        self.bus.ensure_topic(&topic_name).await?;
        for item in &items {
            let payload = serde_json::to_vec(item).unwrap_or_default();
            let attributes =
                HashMap::from([("webset_id".to_string(), webset_id.clone())]);
            self.bus.publish(&topic_name, payload, attributes).await?;
        }

        let duration = (Utc::now() - started).to_std().unwrap_or_default();
        Ok(ResearchResult {
            session_id: webset_id.clone(),
            status: SessionStatus::Completed,
            report_url: Some(format!("/websets/{webset_id}")),
            report_data: Some(json!({
                "topic": topic,
                "item_count": items.len(),
                "items": items,
            })),
            metrics: ResearchMetrics {
                workers_provisioned: 1,
                workers_completed: 1,
                workers_failed: 0,
                total_duration: duration,
                data_points_collected: items.len(),
                cost_estimate: 0.0,
            },
            completed_at: Utc::now(),
        })
    }

    /// Cancels every session's tasks and closes the websets child.
    pub async fn shutdown(&self) {
        info!("shutting down orchestrator");
        self.cancel.cancel();
        self.websets.close().await;
    }
}

/// Collector task: drains the result queue into the session and keeps
/// the progress artifact current. Queue errors are diagnostic only.
async fn collect_results(
    session: SharedSession,
    mut result_rx: mpsc::Receiver<crate::core::WorkerResult>,
    mut error_rx: mpsc::Receiver<String>,
    artifacts: ArtifactWriter,
    cancel: CancellationToken,
) {
    let mut errors_open = true;
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            result = result_rx.recv() => {
                let Some(result) = result else { return };
                info!(
                    worker_id = %result.worker_id,
                    status = ?result.status,
                    "collected result"
                );
                {
                    let mut state = session.write().await;
                    state.record_result(result);
                }
                let state = session.read().await;
                if let Err(e) = artifacts.write_progress(&state).await {
                    warn!(error = %e, "failed to update progress file");
                }
            }
            err = error_rx.recv(), if errors_open => {
                match err {
                    Some(diagnostic) => warn!(%diagnostic, "queue error"),
                    None => errors_open = false,
                }
            }
        }
    }
}
