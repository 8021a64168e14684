//! Shared fixtures: a recording worker host, scripted websets client,
//! and config/orchestrator builders.

// Each integration binary uses a different subset of these fixtures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use widescreen_rs::config::Settings;
use widescreen_rs::core::research::{OutputFormat, PriorityLevel, ResearchDepth};
use widescreen_rs::core::ResearchConfig;
use widescreen_rs::error::{HostError, WebsetsError};
use widescreen_rs::hosting::memory::{InMemoryBus, InMemoryStore};
use widescreen_rs::hosting::MessageBus;
use widescreen_rs::hosting::{WorkerEndpoint, WorkerHost, WorkerSpec};
use widescreen_rs::orchestrator::{Collaborators, MockPlanner, Orchestrator, SubQueryPlanner, Timing};
use widescreen_rs::websets::WebsetsClient;

/// Worker host that hands every worker the same base URL (a wiremock
/// server in practice) and records create/delete calls.
pub struct StubHost {
    url: String,
    fail_suffixes: Vec<String>,
    pub creates: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
}

impl StubHost {
    pub fn new(url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            fail_suffixes: Vec::new(),
            creates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        })
    }

    /// Creation fails for worker ids ending in any of `suffixes`.
    pub fn failing(url: impl Into<String>, suffixes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            fail_suffixes: suffixes.iter().map(|s| (*s).to_string()).collect(),
            creates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> Vec<String> {
        self.creates.lock().expect("lock").clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().expect("lock").clone()
    }
}

#[async_trait]
impl WorkerHost for StubHost {
    async fn create(&self, worker_id: &str, _spec: &WorkerSpec) -> Result<String, HostError> {
        if self.fail_suffixes.iter().any(|s| worker_id.ends_with(s)) {
            return Err(HostError::Create {
                worker_id: worker_id.to_string(),
                message: "stub create failure".to_string(),
            });
        }
        self.creates
            .lock()
            .expect("lock")
            .push(worker_id.to_string());
        Ok(self.url.clone())
    }

    async fn delete(&self, worker_id: &str) -> Result<(), HostError> {
        self.deletes
            .lock()
            .expect("lock")
            .push(worker_id.to_string());
        Ok(())
    }

    async fn get(&self, worker_id: &str) -> Result<WorkerEndpoint, HostError> {
        let _ = worker_id;
        Ok(WorkerEndpoint {
            url: self.url.clone(),
            ready: true,
        })
    }
}

/// Websets client scripted per operation name.
pub struct ScriptedWebsets<F>
where
    F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
{
    call_fn: F,
}

impl<F> ScriptedWebsets<F>
where
    F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
{
    pub fn new(call_fn: F) -> Arc<Self> {
        Arc::new(Self { call_fn })
    }
}

#[async_trait]
impl<F> WebsetsClient for ScriptedWebsets<F>
where
    F: Fn(&Map<String, Value>) -> Result<String, WebsetsError> + Send + Sync,
{
    async fn connect(&self) -> Result<(), WebsetsError> {
        Ok(())
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, WebsetsError> {
        (self.call_fn)(&arguments)
    }

    async fn close(&self) {}
}

/// Websets client for tests that never touch websets.
pub fn no_websets() -> Arc<dyn WebsetsClient> {
    ScriptedWebsets::new(|_| {
        Err(WebsetsError::Call {
            message: "websets not scripted in this test".to_string(),
        })
    })
}

pub fn research_config(session_id: &str, researcher_count: u32) -> ResearchConfig {
    ResearchConfig {
        session_id: session_id.to_string(),
        topic: format!("topic for {session_id}"),
        researcher_count,
        research_depth: ResearchDepth::Basic,
        output_format: OutputFormat::MarkdownReport,
        timeout_minutes: 5,
        priority_level: PriorityLevel::Normal,
        workflow_templates: None,
        specific_sources: None,
        created_at: Utc::now(),
    }
}

pub fn fast_timing(timeout: Duration) -> Timing {
    Timing {
        wait_poll: Duration::from_millis(25),
        timeout_override: Some(timeout),
        websets_poll: Duration::from_millis(5),
        websets_timeout: Duration::from_secs(5),
    }
}

pub struct Fixture {
    pub orchestrator: Orchestrator,
    pub bus: Arc<InMemoryBus>,
    pub store: Arc<InMemoryStore>,
    pub reports_dir: tempfile::TempDir,
}

/// Builds an orchestrator over in-memory collaborators.
pub fn fixture(
    host: Arc<dyn WorkerHost>,
    planner: Arc<dyn SubQueryPlanner>,
    websets: Arc<dyn WebsetsClient>,
    timing: Timing,
) -> Fixture {
    let reports_dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::builder()
        .project_id("test-project")
        .reports_dir(reports_dir.path())
        .build()
        .expect("settings");

    let bus = Arc::new(InMemoryBus::new());
    let store = Arc::new(InMemoryStore::new());

    let deps = Collaborators {
        host,
        bus: bus.clone(),
        store: store.clone(),
        planner,
        websets,
    };

    let orchestrator =
        Orchestrator::new(settings, deps, CancellationToken::new()).with_timing(timing);

    Fixture {
        orchestrator,
        bus,
        store,
        reports_dir,
    }
}

pub fn default_planner() -> Arc<dyn SubQueryPlanner> {
    Arc::new(MockPlanner::new())
}

/// Publishes worker results once the session's queue has subscribed.
pub fn publish_results(bus: Arc<InMemoryBus>, session_id: &str, payloads: Vec<Value>) {
    let topic = format!("research-results-{session_id}");
    tokio::spawn(async move {
        for _ in 0..500 {
            if bus.subscription_count(&topic).await > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for payload in payloads {
            let bytes = serde_json::to_vec(&payload).expect("payload");
            bus.publish(&topic, bytes, HashMap::new())
                .await
                .expect("publish");
        }
    });
}

pub fn worker_result(session_id: &str, index: usize, status: &str) -> Value {
    serde_json::json!({
        "drone_id": format!("drone-{session_id}-{index}"),
        "status": status,
        "data": {
            "summary": format!("findings {index}"),
            "sources": [format!("https://source-{index}.example")],
        },
        "completed_at": Utc::now().to_rfc3339(),
        "processing_time": "2.5s",
    })
}
