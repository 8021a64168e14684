//! Command implementations.

use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Settings;
use crate::error::HostError;
use crate::hosting::fs_store::FsDocumentStore;
use crate::hosting::memory::InMemoryBus;
use crate::hosting::process::ProcessWorkerHost;
use crate::hosting::{WorkerEndpoint, WorkerHost, WorkerSpec};
use crate::mcp::{OrchestratorHandle, WidescreenServer, serve_http, serve_stdio};
use crate::orchestrator::{Collaborators, planner_from_settings};
use crate::resources::GuideLibrary;
use crate::websets::StdioWebsetsClient;

use super::parser::{Cli, Command};

/// Runs the parsed command.
///
/// # Errors
///
/// Returns any startup or runtime error; the binary exits non-zero.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { http } => serve(http).await,
        Command::Guide { name } => guide(&name),
    }
}

async fn serve(http: Option<String>) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // Orchestrator construction is deferred to the first orchestrating
    // call; the server must come up even when the environment is not yet
    // fully configured.
    let handle = Arc::new(OrchestratorHandle::new(
        Box::new(local_collaborators),
        cancel.clone(),
    ));
    let server = WidescreenServer::new(handle);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupt received, shutting down");
            cancel.cancel();
        });
    }

    let result = match http {
        Some(addr) => {
            let (host, port) = addr
                .rsplit_once(':')
                .context("expected --http HOST:PORT")?;
            let port: u16 = port.parse().context("invalid port")?;
            serve_http(server, host, port).await
        }
        None => serve_stdio(server).await,
    };

    // The transport is gone; stop any session tasks still running.
    cancel.cancel();
    result
}

fn guide(name: &str) -> anyhow::Result<()> {
    let library = GuideLibrary::new();
    if name == "list" {
        for guide_name in library.names() {
            println!("{guide_name}");
        }
        return Ok(());
    }

    match library.get(name) {
        Some(guide) => {
            println!("{guide}");
            Ok(())
        }
        None => bail!(
            "guide '{name}' not found; available: {:?}",
            library.names()
        ),
    }
}

/// Local backend wiring: in-memory bus, filesystem document store, and a
/// process-per-worker host when a worker command is configured.
fn local_collaborators(settings: &Settings, _cancel: CancellationToken) -> Collaborators {
    let host: Arc<dyn WorkerHost> = match settings.worker_command.as_deref() {
        Some(command) => ProcessWorkerHost::new(command),
        None => Arc::new(UnconfiguredHost),
    };

    Collaborators {
        host,
        bus: Arc::new(InMemoryBus::new()),
        store: Arc::new(FsDocumentStore::new(settings.reports_dir.join("store"))),
        planner: planner_from_settings(settings),
        websets: Arc::new(StdioWebsetsClient::from_settings(settings)),
    }
}

/// Host used when no local worker command is configured; every create
/// fails with a pointer at the missing setting.
struct UnconfiguredHost;

#[async_trait]
impl WorkerHost for UnconfiguredHost {
    async fn create(&self, worker_id: &str, _spec: &WorkerSpec) -> Result<String, HostError> {
        Err(HostError::Create {
            worker_id: worker_id.to_string(),
            message: "no worker backend configured; set WIDESCREEN_WORKER_COMMAND for the \
                      local process host"
                .to_string(),
        })
    }

    async fn delete(&self, worker_id: &str) -> Result<(), HostError> {
        Err(HostError::NotFound {
            worker_id: worker_id.to_string(),
        })
    }

    async fn get(&self, worker_id: &str) -> Result<WorkerEndpoint, HostError> {
        Err(HostError::NotFound {
            worker_id: worker_id.to_string(),
        })
    }
}
