//! Websets client with serialized calls and single-reconnect recovery.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::WebsetsError;

use super::session::{SessionError, SessionFactory, StdioSessionFactory, ToolReply, ToolSession};

/// The single tool the websets server exposes.
pub const WEBSETS_TOOL: &str = "websets_manager";

/// Client for the external websets MCP server.
#[async_trait]
pub trait WebsetsClient: Send + Sync {
    /// Establishes the session. Idempotent.
    async fn connect(&self) -> Result<(), WebsetsError>;

    /// Invokes `websets_manager` with the given arguments and returns the
    /// response text.
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, WebsetsError>;

    /// Closes the session and the child process with it.
    async fn close(&self);
}

/// [`WebsetsClient`] over a stdio child process.
///
/// One mutex serialises connect, call, and close; for parallelism a
/// caller would instantiate a pool of clients (one client per process in
/// v1). A transport-class call failure triggers exactly one reconnect and
/// retry; any subsequent error surfaces.
pub struct StdioWebsetsClient {
    factory: Arc<dyn SessionFactory>,
    session: Mutex<Option<Box<dyn ToolSession>>>,
}

impl StdioWebsetsClient {
    /// Creates a client spawning the command configured in `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_factory(Arc::new(StdioSessionFactory::from_settings(settings)))
    }

    /// Creates a client over a custom session factory.
    #[must_use]
    pub fn with_factory(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            session: Mutex::new(None),
        }
    }

    fn handle_reply(reply: ToolReply) -> Result<String, WebsetsError> {
        if reply.is_error {
            return Err(WebsetsError::Tool {
                message: reply
                    .text
                    .unwrap_or_else(|| "tool call returned isError=true".to_string()),
            });
        }
        Ok(reply.text.unwrap_or_default())
    }
}

#[async_trait]
impl WebsetsClient for StdioWebsetsClient {
    async fn connect(&self) -> Result<(), WebsetsError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(self.factory.connect().await?);
        Ok(())
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, WebsetsError> {
        let mut guard = self.session.lock().await;

        // Auto-connect on first use.
        if guard.is_none() {
            *guard = Some(self.factory.connect().await?);
        }
        let Some(session) = guard.as_deref() else {
            return Err(WebsetsError::Call {
                message: "session unavailable".to_string(),
            });
        };

        match session.call_tool(WEBSETS_TOOL, arguments.clone()).await {
            Ok(reply) => Self::handle_reply(reply),
            Err(SessionError::Other(message)) => Err(WebsetsError::Call { message }),
            Err(SessionError::Transport(message)) => {
                warn!(%message, "transport error detected, attempting reconnect");
                if let Some(old) = guard.take() {
                    old.close().await;
                }

                let fresh = self
                    .factory
                    .connect()
                    .await
                    .map_err(|e| WebsetsError::Reconnect {
                        message: e.to_string(),
                    })?;

                let retried = fresh.call_tool(WEBSETS_TOOL, arguments).await;
                *guard = Some(fresh);
                match retried {
                    Ok(reply) => Self::handle_reply(reply),
                    Err(e) => Err(WebsetsError::Transport {
                        message: e.to_string(),
                    }),
                }
            }
        }
    }

    async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
            info!("closed websets MCP client");
        }
    }
}
