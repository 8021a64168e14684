//! MCP session seam for the websets child process.
//!
//! [`SessionFactory`] and [`ToolSession`] isolate the reconnect policy in
//! [`super::client`] from the rmcp transport, so the policy can be tested
//! with scripted sessions. The stdio implementations spawn the configured
//! binary and speak MCP over its stdin/stdout.

use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Settings, WEBSETS_CREDENTIAL_VAR};
use crate::error::WebsetsError;

/// Failure from a live tool session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport-class failure; the connection is suspect and the caller
    /// may reconnect.
    Transport(String),
    /// Anything else; retrying on a fresh connection would not help.
    Other(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) | Self::Other(message) => f.write_str(message),
        }
    }
}

/// Transport-error classification by substring.
///
/// A heuristic until the MCP client library exposes typed error kinds;
/// kept in one place so it can be swapped out wholesale.
#[must_use]
pub fn is_transport_error(message: &str) -> bool {
    message.contains("transport")
        || message.contains("connection")
        || message.contains("pipe")
        || message.contains("EOF")
}

/// Outcome of one tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolReply {
    /// The tool's `isError` flag.
    pub is_error: bool,
    /// First text content of the response, if any.
    pub text: Option<String>,
}

/// A connected MCP session that can invoke tools.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invokes `name` with `arguments`.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolReply, SessionError>;

    /// Closes the session; the child exits on its stdin being closed.
    async fn close(&self);
}

/// Connects new [`ToolSession`]s.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Establishes a fresh session.
    async fn connect(&self) -> Result<Box<dyn ToolSession>, WebsetsError>;
}

/// Factory spawning the websets MCP server as a child process.
pub struct StdioSessionFactory {
    bin: String,
    args: Vec<String>,
    credential_var: &'static str,
}

impl StdioSessionFactory {
    /// Creates a factory for the configured websets command.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bin: settings.websets_bin.clone(),
            args: settings.websets_args.clone(),
            credential_var: WEBSETS_CREDENTIAL_VAR,
        }
    }
}

#[async_trait]
impl SessionFactory for StdioSessionFactory {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, WebsetsError> {
        // The child authenticates with the external service itself; fail
        // fast here instead of spawning a process that cannot work.
        if std::env::var(self.credential_var)
            .unwrap_or_default()
            .is_empty()
        {
            return Err(WebsetsError::CredentialMissing {
                var: self.credential_var,
            });
        }

        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.args);

        let transport = TokioChildProcess::new(cmd).map_err(|e| WebsetsError::Connect {
            message: format!("spawn {}: {e}", self.bin),
        })?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| WebsetsError::Connect {
                message: e.to_string(),
            })?;

        info!(bin = %self.bin, "connected to websets MCP server");
        Ok(Box::new(StdioToolSession {
            service: Mutex::new(Some(service)),
        }))
    }
}

struct StdioToolSession {
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

#[async_trait]
impl ToolSession for StdioToolSession {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolReply, SessionError> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| SessionError::Other("session closed".to_string()))?;

        let result = service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| {
                let message = e.to_string();
                if is_transport_error(&message) {
                    SessionError::Transport(message)
                } else {
                    SessionError::Other(message)
                }
            })?;

        let text = result
            .content
            .first()
            .and_then(|c| c.raw.as_text())
            .map(|t| t.text.clone());

        Ok(ToolReply {
            is_error: result.is_error.unwrap_or(false),
            text,
        })
    }

    async fn close(&self) {
        if let Some(service) = self.service.lock().await.take() {
            let _ = service.cancel().await;
        }
    }
}
