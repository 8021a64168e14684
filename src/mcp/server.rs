//! MCP server implementation for widescreen research.
//!
//! Exposes exactly two tools: `widescreen_research`, a single entry point
//! demultiplexed over its `operation` parameter, and `get_guide` for the
//! embedded documentation. Tool results are always JSON text payloads;
//! failures become MCP tool errors carrying a single-line message plus a
//! correlation id, with detail left to the logs.

use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::error;
use uuid::Uuid;

use crate::config::Settings;
use crate::core::{ElicitationResponse, ResponseKind};
use crate::elicitation::{ElicitationManager, initial_questions};
use crate::operations::{self, Operation};
use crate::orchestrator::{Collaborators, Orchestrator, Timing};
use crate::resources::GuideLibrary;

use super::params::{GetGuideParams, WidescreenResearchParams, WebsetsOrchestrateParams};

/// Builds the collaborators once settings are known.
pub type CollaboratorFactory =
    dyn Fn(&Settings, CancellationToken) -> Collaborators + Send + Sync;

/// Lazily initialized orchestrator.
///
/// Construction is deferred to the first orchestrating call so that
/// configuration problems (a missing project id, say) surface to the MCP
/// caller instead of killing the process before the transport is up.
pub struct OrchestratorHandle {
    cell: OnceCell<Arc<Orchestrator>>,
    factory: Mutex<Option<Box<CollaboratorFactory>>>,
    timing: Timing,
    cancel: CancellationToken,
}

impl OrchestratorHandle {
    /// Creates a handle that will build collaborators via `factory`.
    #[must_use]
    pub fn new(factory: Box<CollaboratorFactory>, cancel: CancellationToken) -> Self {
        Self {
            cell: OnceCell::new(),
            factory: Mutex::new(Some(factory)),
            timing: Timing::default(),
            cancel,
        }
    }

    /// Creates a handle around an already-built orchestrator.
    #[must_use]
    pub fn from_orchestrator(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(orchestrator)),
            factory: Mutex::new(None),
            timing: Timing::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the timing knobs used when the orchestrator is built.
    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Returns the orchestrator, building it on first use.
    ///
    /// # Errors
    ///
    /// Surfaces configuration errors from `Settings::from_env`.
    pub async fn get(&self) -> anyhow::Result<Arc<Orchestrator>> {
        self.cell
            .get_or_try_init(|| async {
                // Resolve settings before consuming the factory so a
                // configuration error leaves the handle retryable.
                let settings = Settings::from_env()?;
                let factory = self
                    .factory
                    .lock()
                    .await
                    .take()
                    .ok_or_else(|| anyhow!("orchestrator initialization already in flight"))?;
                let deps = factory(&settings, self.cancel.child_token());
                Ok::<_, anyhow::Error>(Arc::new(
                    Orchestrator::new(settings, deps, self.cancel.child_token())
                        .with_timing(self.timing.clone()),
                ))
            })
            .await
            .cloned()
    }
}

/// The widescreen research MCP server.
#[derive(Clone)]
pub struct WidescreenServer {
    tool_router: ToolRouter<Self>,
    elicitation: Arc<ElicitationManager>,
    orchestrator: Arc<OrchestratorHandle>,
    guides: GuideLibrary,
}

#[tool_router]
impl WidescreenServer {
    /// Run a widescreen research operation.
    #[tool(
        name = "widescreen_research",
        description = "Perform comprehensive widescreen research using distributed research drones. Call with no operation to configure a session through guided questions, then with operation=orchestrate-research to run it. Other operations: sequential-thinking, gcp-provision, analyze-findings, websets-orchestrate, websets-call."
    )]
    async fn widescreen_research(
        &self,
        Parameters(params): Parameters<WidescreenResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let correlation_id = short_id();
        match self.handle_request(&params).await {
            Ok(value) => {
                let text = serde_json::to_string(&value).map_err(|e| {
                    McpError::internal_error(format!("serialization error: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                error!(
                    %correlation_id,
                    operation = %params.operation,
                    error = format!("{e:#}"),
                    "widescreen_research failed"
                );
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "{e} [correlation_id={correlation_id}]"
                ))]))
            }
        }
    }

    /// Read an embedded guide.
    #[tool(
        name = "get_guide",
        description = "Get research system guides and documentation. Use 'list' as name to see all available guides."
    )]
    async fn get_guide(
        &self,
        Parameters(params): Parameters<GetGuideParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.name == "list" {
            let mut text = "Available guides:\n".to_string();
            for name in self.guides.names() {
                text.push_str(&format!("- {name}\n"));
            }
            text.push_str("\nUse get_guide with the guide name to read it.");
            return Ok(CallToolResult::success(vec![Content::text(text)]));
        }

        match self.guides.get(&params.name) {
            Some(guide) => Ok(CallToolResult::success(vec![Content::text(guide)])),
            None => Ok(CallToolResult::error(vec![Content::text(format!(
                "Guide '{}' not found. Available guides: {:?}",
                params.name,
                self.guides.names()
            ))])),
        }
    }
}

impl WidescreenServer {
    /// Creates a server over a lazily initialized orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<OrchestratorHandle>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            elicitation: Arc::new(ElicitationManager::new()),
            orchestrator,
            guides: GuideLibrary::new(),
        }
    }

    async fn handle_request(&self, params: &WidescreenResearchParams) -> anyhow::Result<Value> {
        let Some(operation) = Operation::parse(&params.operation) else {
            bail!("unknown operation: {}", params.operation);
        };

        match operation {
            Operation::Start => self.handle_elicitation(params).await,
            Operation::OrchestrateResearch => {
                let orchestrator = self.orchestrator.get().await?;
                let config = self
                    .elicitation
                    .research_config(&params.session_id)
                    .await
                    .context("no research configuration found for session")?;
                let result = orchestrator.run_research(config).await?;
                Ok(serde_json::to_value(result)?)
            }
            Operation::SequentialThinking => {
                let thinking: operations::ThinkingParams =
                    parse_parameters(&params.parameters_json)?;
                Ok(serde_json::to_value(operations::run_thinking(&thinking)?)?)
            }
            Operation::GcpProvision => {
                let orchestrator = self.orchestrator.get().await?;
                let provision: operations::ProvisionParams =
                    parse_parameters(&params.parameters_json)?;
                let response = operations::provision::run(
                    &orchestrator.host(),
                    &orchestrator.bus(),
                    orchestrator.settings(),
                    &provision,
                )
                .await?;
                Ok(serde_json::to_value(response)?)
            }
            Operation::AnalyzeFindings => {
                let analyze: operations::AnalyzeParams =
                    parse_parameters(&params.parameters_json)?;
                Ok(serde_json::to_value(operations::run_analyze(&analyze)?)?)
            }
            Operation::WebsetsOrchestrate => {
                let orchestrator = self.orchestrator.get().await?;
                let websets: WebsetsOrchestrateParams =
                    parse_parameters(&params.parameters_json)?;
                let result = orchestrator
                    .run_websets_pipeline(&websets.topic, websets.result_count)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            Operation::WebsetsCall => {
                let orchestrator = self.orchestrator.get().await?;
                let arguments: Map<String, Value> = parse_parameters(&params.parameters_json)?;
                let text = orchestrator.websets_client().call(arguments).await?;
                Ok(Value::String(text))
            }
        }
    }

    async fn handle_elicitation(
        &self,
        params: &WidescreenResearchParams,
    ) -> anyhow::Result<Value> {
        // A call without a session starts a fresh one; an unknown id is
        // an error (the session may have been evicted) and the caller
        // starts over.
        if params.session_id.is_empty() {
            let session_id = self.elicitation.create_session().await;
            return Ok(json!(ElicitationResponse {
                kind: ResponseKind::Elicitation,
                questions: initial_questions(),
                session_id,
                message: None,
                config: None,
            }));
        }

        let answers = parse_answers(&params.elicitation_answers_json);
        let (questions, complete) = self
            .elicitation
            .process_answers(&params.session_id, &answers)
            .await?;

        if !complete {
            return Ok(json!(ElicitationResponse {
                kind: ResponseKind::Elicitation,
                questions,
                session_id: params.session_id.clone(),
                message: None,
                config: None,
            }));
        }

        let config = self
            .elicitation
            .research_config(&params.session_id)
            .await
            .context("no research configuration found for session")?;
        Ok(json!(ElicitationResponse {
            kind: ResponseKind::Ready,
            questions: Vec::new(),
            session_id: params.session_id.clone(),
            message: Some("Elicitation complete. Ready to start research.".to_string()),
            config: Some(config),
        }))
    }
}

#[tool_handler]
impl ServerHandler for WidescreenServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "widescreen-research".to_string(),
                title: Some("Widescreen Research MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Distributed research orchestrator. Call `widescreen_research` with no \
                 operation to configure a session through guided questions, then with \
                 operation=orchestrate-research to run the worker fleet. Read `get_guide` \
                 (name=list) for the full workflow documentation."
                    .to_string(),
            ),
        }
    }
}

/// Decodes a `parameters_json` payload, treating empty as `{}`.
fn parse_parameters<T: serde::de::DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).with_context(|| "invalid parameters_json")
}

/// Decodes the answer map leniently: malformed JSON is treated as no
/// answers rather than an error, favoring conversational robustness.
fn parse_answers(raw: &str) -> Map<String, Value> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> WidescreenServer {
        // A factory that is never invoked by elicitation-only tests.
        let handle = OrchestratorHandle::new(
            Box::new(|_, _| unreachable!("collaborators not needed")),
            CancellationToken::new(),
        );
        WidescreenServer::new(Arc::new(handle))
    }

    async fn call(
        server: &WidescreenServer,
        operation: &str,
        session_id: &str,
        answers: &str,
    ) -> anyhow::Result<Value> {
        server
            .handle_request(&WidescreenResearchParams {
                operation: operation.to_string(),
                session_id: session_id.to_string(),
                parameters_json: String::new(),
                elicitation_answers_json: answers.to_string(),
            })
            .await
    }

    #[tokio::test]
    async fn test_unknown_operation_is_error() {
        let err = call(&server(), "mine-bitcoin", "", "")
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("unknown operation"));
    }

    #[tokio::test]
    async fn test_elicitation_flow_reaches_ready() {
        let server = server();

        let first = call(&server, "", "", "").await.expect("start");
        assert_eq!(first["type"], "elicitation");
        let session_id = first["session_id"].as_str().expect("session id").to_string();
        assert_eq!(first["questions"].as_array().map(Vec::len), Some(3));

        let second = call(
            &server,
            "start",
            &session_id,
            r#"{"research_topic": "AI safety", "researcher_count": 3, "research_depth": "basic"}"#,
        )
        .await
        .expect("initial answers");
        assert_eq!(second["type"], "elicitation");

        let third = call(
            &server,
            "start",
            &session_id,
            r#"{"output_format": "markdown_report"}"#,
        )
        .await
        .expect("workflow answers");
        assert_eq!(third["type"], "elicitation");

        let fourth = call(
            &server,
            "start",
            &session_id,
            r#"{"timeout_minutes": 10, "priority_level": "normal"}"#,
        )
        .await
        .expect("advanced answers");
        assert_eq!(fourth["type"], "ready");
        assert_eq!(fourth["config"]["topic"], "AI safety");
        assert_eq!(fourth["config"]["researcher_count"], 3);
        assert_eq!(fourth["config"]["timeout_minutes"], 10);
    }

    #[tokio::test]
    async fn test_unknown_session_surfaces_error() {
        let err = call(&server(), "start", "no-such-session", "{}")
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("no such elicitation session"));
    }

    #[tokio::test]
    async fn test_malformed_answers_are_ignored() {
        let server = server();
        let first = call(&server, "", "", "").await.expect("start");
        let session_id = first["session_id"].as_str().expect("id").to_string();

        let second = call(&server, "start", &session_id, "{not json")
            .await
            .expect("tolerates malformed answers");
        assert_eq!(second["type"], "elicitation");
    }

    #[tokio::test]
    async fn test_empty_problem_is_validation_error() {
        let server = server();
        let err = server
            .handle_request(&WidescreenResearchParams {
                operation: "sequential-thinking".to_string(),
                parameters_json: r#"{"problem": ""}"#.to_string(),
                ..WidescreenResearchParams::default()
            })
            .await
            .expect_err("empty problem");
        assert!(err.to_string().contains("validation"));
    }

    #[tokio::test]
    async fn test_sequential_thinking_operation() {
        let server = server();
        let value = server
            .handle_request(&WidescreenResearchParams {
                operation: "sequential-thinking".to_string(),
                parameters_json: r#"{"problem": "map the supply chain"}"#.to_string(),
                ..WidescreenResearchParams::default()
            })
            .await
            .expect("thinking");
        assert_eq!(value["thoughts"].as_array().map(Vec::len), Some(3));
        assert!(value["solution"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_analyze_findings_operation() {
        let server = server();
        let value = server
            .handle_request(&WidescreenResearchParams {
                operation: "analyze-findings".to_string(),
                parameters_json: r#"{
                    "data": [{"drone_id": "a", "status": "completed", "data": {"k": 1}}],
                    "analysis_type": "comprehensive"
                }"#
                .to_string(),
                ..WidescreenResearchParams::default()
            })
            .await
            .expect("analysis");
        assert!(value["summary"].as_str().is_some());
        assert_eq!(value["statistics"]["total_results"], 1);
    }
}
