//! Local worker host that runs each worker as a child process.
//!
//! The configured worker command is launched once per worker with the
//! spec's environment plus a `PORT` assigned from a local range, then
//! polled on `GET /health` until ready. `delete` kills the child. This is
//! the development backend; real deployments implement [`WorkerHost`]
//! against their compute service.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::HostError;

use super::{WorkerEndpoint, WorkerHost, WorkerSpec};

/// First port handed to a spawned worker.
const BASE_PORT: u16 = 7701;
/// How long to wait for a spawned worker to become healthy.
const READINESS_TIMEOUT: Duration = Duration::from_secs(30);
/// Poll interval while waiting for readiness.
const READINESS_POLL: Duration = Duration::from_millis(250);

struct LocalWorker {
    child: Child,
    url: String,
}

/// Worker host spawning local child processes.
pub struct ProcessWorkerHost {
    command: String,
    args: Vec<String>,
    next_port: AtomicU16,
    workers: Mutex<HashMap<String, LocalWorker>>,
    http: reqwest::Client,
}

impl ProcessWorkerHost {
    /// Creates a host that launches workers via `command`.
    ///
    /// The command string is split on whitespace; the first token is the
    /// program, the rest are leading arguments.
    #[must_use]
    pub fn new(command: &str) -> Arc<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| command.to_string());
        Arc::new(Self {
            command: program,
            args: parts.collect(),
            next_port: AtomicU16::new(BASE_PORT),
            workers: Mutex::new(HashMap::new()),
            http: reqwest::Client::new(),
        })
    }

    async fn wait_ready(&self, url: &str) -> bool {
        let deadline = tokio::time::Instant::now() + READINESS_TIMEOUT;
        let health = format!("{url}/health");
        while tokio::time::Instant::now() < deadline {
            if let Ok(resp) = self.http.get(&health).send().await
                && resp.status().is_success()
            {
                return true;
            }
            tokio::time::sleep(READINESS_POLL).await;
        }
        false
    }
}

#[async_trait]
impl WorkerHost for ProcessWorkerHost {
    async fn create(&self, worker_id: &str, spec: &WorkerSpec) -> Result<String, HostError> {
        let port = self.next_port.fetch_add(1, Ordering::SeqCst);
        let url = format!("http://127.0.0.1:{port}");

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .env("PORT", port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| HostError::Create {
            worker_id: worker_id.to_string(),
            message: format!("spawn {}: {e}", self.command),
        })?;

        debug!(worker_id, %url, "spawned local worker");

        if !self.wait_ready(&url).await {
            return Err(HostError::Create {
                worker_id: worker_id.to_string(),
                message: format!("worker never became healthy at {url}"),
            });
        }

        self.workers.lock().await.insert(
            worker_id.to_string(),
            LocalWorker {
                child,
                url: url.clone(),
            },
        );

        Ok(url)
    }

    async fn delete(&self, worker_id: &str) -> Result<(), HostError> {
        let Some(mut worker) = self.workers.lock().await.remove(worker_id) else {
            return Err(HostError::NotFound {
                worker_id: worker_id.to_string(),
            });
        };

        if let Err(e) = worker.child.kill().await {
            warn!(worker_id, error = %e, "failed to kill local worker");
            return Err(HostError::Delete {
                worker_id: worker_id.to_string(),
                message: e.to_string(),
            });
        }
        let _ = worker.child.wait().await;
        Ok(())
    }

    async fn get(&self, worker_id: &str) -> Result<WorkerEndpoint, HostError> {
        let workers = self.workers.lock().await;
        let worker = workers.get(worker_id).ok_or_else(|| HostError::NotFound {
            worker_id: worker_id.to_string(),
        })?;
        Ok(WorkerEndpoint {
            url: worker.url.clone(),
            ready: true,
        })
    }
}
