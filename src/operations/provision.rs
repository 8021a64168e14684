//! Direct resource provisioning operation.
//!
//! Provisions workers or bus topics through the abstract collaborators,
//! outside any research session. The resource type names `cloud_run` and
//! `pubsub` are accepted as aliases of `worker` and `topic` for callers
//! of the original surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::Settings;
use crate::core::research::PriorityLevel;
use crate::error::OrchestratorError;
use crate::hosting::{MessageBus, WorkerHost, WorkerSpec};
use crate::orchestrator::resource_limits;

/// Default lifetime for directly provisioned workers.
const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// What kind of resource to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// A worker instance.
    Worker,
    /// A bus topic.
    Topic,
}

impl ResourceType {
    /// Parses a resource type, accepting the original surface's aliases.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "worker" | "cloud_run" => Some(Self::Worker),
            "topic" | "pubsub" => Some(Self::Topic),
            _ => None,
        }
    }
}

/// Parameters of the `gcp-provision` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionParams {
    /// Resource type string.
    pub resource_type: String,
    /// How many resources to create.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Region override.
    #[serde(default)]
    pub region: Option<String>,
    /// Type-specific configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
}

fn default_count() -> usize {
    1
}

/// One provisioned resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedResource {
    /// Resource id.
    pub id: String,
    /// Resource type string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Reachable URL, for workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Outcome for this resource.
    pub status: String,
    /// Region the resource lives in.
    pub region: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Response of the `gcp-provision` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionResponse {
    /// Created resources.
    pub resources: Vec<ProvisionedResource>,
    /// Overall outcome.
    pub status: String,
    /// Optional diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Executes the provisioning request.
///
/// # Errors
///
/// Returns [`OrchestratorError::Validation`] for an unknown resource
/// type; per-resource failures are reported in the response instead.
pub async fn run(
    host: &Arc<dyn WorkerHost>,
    bus: &Arc<dyn MessageBus>,
    settings: &Settings,
    params: &ProvisionParams,
) -> Result<ProvisionResponse, OrchestratorError> {
    let Some(kind) = ResourceType::parse(&params.resource_type) else {
        return Err(OrchestratorError::Validation {
            message: format!("unsupported resource type: {}", params.resource_type),
        });
    };

    let region = params
        .region
        .clone()
        .unwrap_or_else(|| settings.region.clone());

    match kind {
        ResourceType::Worker => provision_workers(host, settings, &region, params).await,
        ResourceType::Topic => provision_topics(bus, &region, params).await,
    }
}

async fn provision_workers(
    host: &Arc<dyn WorkerHost>,
    settings: &Settings,
    region: &str,
    params: &ProvisionParams,
) -> Result<ProvisionResponse, OrchestratorError> {
    let image = params
        .config
        .get("image")
        .and_then(Value::as_str)
        .unwrap_or(&settings.worker_image)
        .to_string();
    let priority = params
        .config
        .get("priority")
        .and_then(Value::as_str)
        .map_or(PriorityLevel::Normal, PriorityLevel::parse);
    let timeout = params
        .config
        .get("timeout_seconds")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_WORKER_TIMEOUT, Duration::from_secs);

    let run_id = Uuid::new_v4().simple().to_string();
    let mut resources = Vec::with_capacity(params.count);
    let mut failures = 0usize;

    for index in 0..params.count {
        let id = format!("service-{}-{index}", &run_id[..8]);
        let spec = WorkerSpec {
            image: image.clone(),
            env: HashMap::from([("WORKER_ID".to_string(), id.clone())]),
            limits: resource_limits(priority),
            concurrency_limit: 1,
            timeout,
        };

        match host.create(&id, &spec).await {
            Ok(url) => resources.push(ProvisionedResource {
                id,
                kind: "worker".to_string(),
                url: Some(url),
                status: "ready".to_string(),
                region: region.to_string(),
                created_at: Utc::now(),
            }),
            Err(e) => {
                failures += 1;
                resources.push(ProvisionedResource {
                    id,
                    kind: "worker".to_string(),
                    url: None,
                    status: format!("failed: {e}"),
                    region: region.to_string(),
                    created_at: Utc::now(),
                });
            }
        }
    }

    Ok(summarize(resources, failures))
}

async fn provision_topics(
    bus: &Arc<dyn MessageBus>,
    region: &str,
    params: &ProvisionParams,
) -> Result<ProvisionResponse, OrchestratorError> {
    let prefix = params
        .config
        .get("name_prefix")
        .and_then(Value::as_str)
        .unwrap_or("research-topic");

    let mut resources = Vec::with_capacity(params.count);
    let mut failures = 0usize;

    for index in 0..params.count {
        let name = format!("{prefix}-{index}");
        let status = match bus.ensure_topic(&name).await {
            Ok(()) => "ready".to_string(),
            Err(e) => {
                failures += 1;
                format!("failed: {e}")
            }
        };
        resources.push(ProvisionedResource {
            id: name,
            kind: "topic".to_string(),
            url: None,
            status,
            region: region.to_string(),
            created_at: Utc::now(),
        });
    }

    Ok(summarize(resources, failures))
}

fn summarize(resources: Vec<ProvisionedResource>, failures: usize) -> ProvisionResponse {
    let status = if failures == 0 {
        "completed"
    } else if failures == resources.len() {
        "failed"
    } else {
        "partial"
    };
    let message = (failures > 0).then(|| format!("{failures} resources failed"));
    ProvisionResponse {
        resources,
        status: status.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::HostError;
    use crate::hosting::WorkerEndpoint;
    use crate::hosting::memory::InMemoryBus;

    struct FlakyHost;

    #[async_trait]
    impl WorkerHost for FlakyHost {
        async fn create(&self, worker_id: &str, _spec: &WorkerSpec) -> Result<String, HostError> {
            if worker_id.ends_with("-1") {
                Err(HostError::Create {
                    worker_id: worker_id.to_string(),
                    message: "quota".to_string(),
                })
            } else {
                Ok(format!("http://{worker_id}"))
            }
        }

        async fn delete(&self, _worker_id: &str) -> Result<(), HostError> {
            Ok(())
        }

        async fn get(&self, worker_id: &str) -> Result<WorkerEndpoint, HostError> {
            Ok(WorkerEndpoint {
                url: format!("http://{worker_id}"),
                ready: true,
            })
        }
    }

    fn settings() -> Settings {
        Settings::builder()
            .project_id("p")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn test_worker_provisioning_partial_failure() {
        let host: Arc<dyn WorkerHost> = Arc::new(FlakyHost);
        let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
        let params = ProvisionParams {
            resource_type: "cloud_run".to_string(),
            count: 2,
            region: None,
            config: Map::new(),
        };

        let response = run(&host, &bus, &settings(), &params).await.expect("run");
        assert_eq!(response.resources.len(), 2);
        assert_eq!(response.status, "partial");
        assert!(response.resources[0].url.is_some());
        assert!(response.resources[1].status.starts_with("failed"));
    }

    #[tokio::test]
    async fn test_topic_provisioning() {
        let host: Arc<dyn WorkerHost> = Arc::new(FlakyHost);
        let memory_bus = Arc::new(InMemoryBus::new());
        let bus: Arc<dyn MessageBus> = memory_bus.clone();
        let params = ProvisionParams {
            resource_type: "pubsub".to_string(),
            count: 2,
            region: Some("europe-west1".to_string()),
            config: Map::new(),
        };

        let response = run(&host, &bus, &settings(), &params).await.expect("run");
        assert_eq!(response.status, "completed");
        assert!(memory_bus.topic_exists("research-topic-0").await);
        assert_eq!(response.resources[0].region, "europe-west1");
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let host: Arc<dyn WorkerHost> = Arc::new(FlakyHost);
        let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
        let params = ProvisionParams {
            resource_type: "mainframe".to_string(),
            count: 1,
            region: None,
            config: Map::new(),
        };
        assert!(run(&host, &bus, &settings(), &params).await.is_err());
    }
}
