//! Fleet provisioning.
//!
//! Fans worker creation out across concurrent tasks and fans errors back
//! in over a channel. There is no retry at this layer: the host is
//! assumed to handle its own transient retries, and a single failed
//! `create` fails the provisioning step (the workers that did succeed are
//! recorded on the session so the engine's cleanup deletes them).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::{ResearchConfig, WorkerStatus};
use crate::core::research::PriorityLevel;
use crate::error::OrchestratorError;
use crate::hosting::{ResourceLimits, WorkerHost, WorkerSpec};

use super::session::{SharedSession, WorkerInfo};

/// Name of the results topic for a session.
#[must_use]
pub fn results_topic(session_id: &str) -> String {
    format!("research-results-{session_id}")
}

/// Worker id for a session/index pair.
#[must_use]
pub fn worker_id(session_id: &str, index: usize) -> String {
    format!("drone-{session_id}-{index}")
}

/// Maps a priority level to worker resource limits.
#[must_use]
pub const fn resource_limits(priority: PriorityLevel) -> ResourceLimits {
    match priority {
        PriorityLevel::Low => ResourceLimits {
            cpu: 0.5,
            memory_mib: 512,
        },
        PriorityLevel::Normal => ResourceLimits {
            cpu: 1.0,
            memory_mib: 1024,
        },
        PriorityLevel::High => ResourceLimits {
            cpu: 2.0,
            memory_mib: 2048,
        },
    }
}

/// Parallel worker creation and teardown over a [`WorkerHost`].
pub struct FleetProvisioner {
    host: Arc<dyn WorkerHost>,
    image: String,
    region: String,
}

impl FleetProvisioner {
    /// Creates a provisioner deploying `image` into `region`.
    #[must_use]
    pub fn new(host: Arc<dyn WorkerHost>, image: String, region: String) -> Self {
        Self {
            host,
            image,
            region,
        }
    }

    /// Uniform environment for one worker. Workers publish results onto
    /// the bus; no orchestrator URL is passed.
    fn worker_env(&self, id: &str, config: &ResearchConfig) -> HashMap<String, String> {
        HashMap::from([
            ("DRONE_ID".to_string(), id.to_string()),
            ("SESSION_ID".to_string(), config.session_id.clone()),
            ("RESEARCH_TOPIC".to_string(), config.topic.clone()),
            (
                "RESEARCH_DEPTH".to_string(),
                config.research_depth.as_str().to_string(),
            ),
            (
                "PUBSUB_TOPIC".to_string(),
                results_topic(&config.session_id),
            ),
            ("REGION".to_string(), self.region.clone()),
        ])
    }

    fn worker_spec(&self, id: &str, config: &ResearchConfig) -> WorkerSpec {
        WorkerSpec {
            image: self.image.clone(),
            env: self.worker_env(id, config),
            limits: resource_limits(config.priority_level),
            concurrency_limit: 1,
            timeout: Duration::from_secs(u64::from(config.timeout_minutes) * 60),
        }
    }

    /// Creates `count` workers concurrently and records the successes on
    /// the session in index order.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Provisioning`] if any creation failed.
    /// Successfully created workers are recorded on the session either
    /// way so cleanup can delete them.
    pub async fn provision(
        &self,
        session: &SharedSession,
        count: usize,
    ) -> Result<(), OrchestratorError> {
        let config = session.read().await.config.clone();
        let (error_tx, mut error_rx) = mpsc::channel::<String>(count.max(1));

        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let id = worker_id(&config.session_id, index);
            let spec = self.worker_spec(&id, &config);
            let host = Arc::clone(&self.host);
            let errors = error_tx.clone();

            handles.push(tokio::spawn(async move {
                match host.create(&id, &spec).await {
                    Ok(url) => {
                        info!(worker_id = %id, %url, "deployed worker");
                        Some((index, id, url))
                    }
                    Err(e) => {
                        let _ = errors.send(format!("failed to deploy worker {id}: {e}")).await;
                        None
                    }
                }
            }));
        }
        drop(error_tx);

        let mut created: Vec<(usize, String, String)> = Vec::with_capacity(count);
        for handle in handles {
            match handle.await {
                Ok(Some(worker)) => created.push(worker),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "provisioning task panicked"),
            }
        }
        created.sort_by_key(|(index, _, _)| *index);

        {
            let now = Utc::now();
            let mut state = session.write().await;
            for (_, id, url) in &created {
                state.worker_order.push(id.clone());
                state.workers.insert(
                    id.clone(),
                    WorkerInfo {
                        id: id.clone(),
                        url: url.clone(),
                        status: WorkerStatus::Deployed,
                        start_time: now,
                        last_checkin: now,
                    },
                );
            }
        }

        let mut errors = Vec::new();
        while let Some(message) = error_rx.recv().await {
            errors.push(message);
        }
        if !errors.is_empty() {
            return Err(OrchestratorError::Provisioning {
                count: errors.len(),
                first: errors.swap_remove(0),
            });
        }

        Ok(())
    }

    /// Deletes every worker recorded on the session, exactly once each.
    /// Failures are logged and never re-raised; teardown is best-effort.
    pub async fn teardown(&self, session: &SharedSession) {
        let ids: Vec<String> = {
            let state = session.read().await;
            state.worker_order.clone()
        };

        for id in ids {
            if let Err(e) = self.host.delete(&id).await {
                warn!(worker_id = %id, error = %e, "failed to delete worker");
            }
            let mut state = session.write().await;
            if let Some(worker) = state.workers.get_mut(&id) {
                worker.status = WorkerStatus::Terminated;
            }
        }
    }

    /// Read access to the host, for the provisioning operation handler.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn WorkerHost> {
        &self.host
    }
}
