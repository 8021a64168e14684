//! Worker HTTP contract: instruction dispatch and health probing.
//!
//! Workers expose `POST /instructions` (accepting the research command
//! envelope) and `GET /health`. Dispatch failures are per-worker and
//! non-fatal; a worker that was never instructed simply cannot complete.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::WorkerStatus;

use super::session::SharedSession;

/// Deadline for one instruction POST.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for one health probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
/// Interval between health probe rounds.
const HEALTH_INTERVAL: Duration = Duration::from_secs(10);

/// HTTP client for the worker-side contract.
#[derive(Clone)]
pub struct InstructionClient {
    http: reqwest::Client,
}

impl Default for InstructionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionClient {
    /// Creates a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// POSTs a research command to `worker_url + "/instructions"`.
    ///
    /// # Errors
    ///
    /// Returns the transport or status failure as a string; the caller
    /// marks the worker `failed_to_instruct` and moves on.
    pub async fn send_instruction(
        &self,
        worker_url: &str,
        subject: &str,
        run_id: &str,
    ) -> Result<(), String> {
        let command = json!({
            "type": "research_command",
            "instructions": {
                "subject": subject,
                "run_id": run_id,
            },
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self
            .http
            .post(format!("{worker_url}/instructions"))
            .timeout(DISPATCH_TIMEOUT)
            .json(&command)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!(
                "failed to send instructions, status: {}",
                response.status().as_u16()
            ));
        }
        Ok(())
    }

    /// Probes `worker_url + "/health"`.
    ///
    /// # Errors
    ///
    /// Returns the failure as a string; the probe loop marks the worker
    /// unhealthy.
    pub async fn check_health(&self, worker_url: &str) -> Result<(), String> {
        let response = self
            .http
            .get(format!("{worker_url}/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!(
                "health check returned status {}",
                response.status().as_u16()
            ));
        }
        Ok(())
    }
}

/// Spawns the per-session health probe.
///
/// Every tick it snapshots the worker endpoints, probes each without
/// holding the session lock, and marks unresponsive workers `unhealthy`.
/// The task exits on cancellation.
pub fn spawn_health_probe(
    client: InstructionClient,
    session: SharedSession,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so
        // workers get a grace period after dispatch.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let endpoints = session.read().await.worker_endpoints();
            for (id, url) in endpoints {
                match client.check_health(&url).await {
                    Ok(()) => {
                        let mut state = session.write().await;
                        if let Some(worker) = state.workers.get_mut(&id) {
                            worker.last_checkin = Utc::now();
                        }
                        debug!(worker_id = %id, "health ok");
                    }
                    Err(e) => {
                        warn!(worker_id = %id, error = %e, "health check failed");
                        let mut state = session.write().await;
                        if let Some(worker) = state.workers.get_mut(&id)
                            && !matches!(
                                worker.status,
                                WorkerStatus::Completed
                                    | WorkerStatus::Failed
                                    | WorkerStatus::Terminated
                            )
                        {
                            worker.status = WorkerStatus::Unhealthy;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_instruction_posts_command_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instructions"))
            .and(body_partial_json(json!({
                "type": "research_command",
                "instructions": {"subject": "sub-query 1", "run_id": "s-1"},
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = InstructionClient::new();
        client
            .send_instruction(&server.uri(), "sub-query 1", "s-1")
            .await
            .expect("dispatch");
    }

    #[tokio::test]
    async fn test_send_instruction_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instructions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = InstructionClient::new();
        let err = client
            .send_instruction(&server.uri(), "q", "s")
            .await
            .expect_err("expected failure");
        assert!(err.contains("500"));
    }

    #[tokio::test]
    async fn test_check_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = InstructionClient::new();
        assert!(client.check_health(&server.uri()).await.is_ok());
        assert!(client.check_health("http://127.0.0.1:1").await.is_err());
    }
}
