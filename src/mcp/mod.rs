//! MCP (Model Context Protocol) surface for the research orchestrator.
//!
//! Two tools only: `widescreen_research` demultiplexes every operation
//! over its `operation` parameter, and `get_guide` serves the embedded
//! documentation. Everything else is internal.
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ widescreen_research(operation, session_id, parameters_json, answers_json)
//! WidescreenServer
//!   ├── operation ∈ {"", start}  → ElicitationManager
//!   ├── orchestrate-research     → Orchestrator::run_research
//!   ├── websets-orchestrate      → Orchestrator::run_websets_pipeline
//!   ├── websets-call             → WebsetsClient::call
//!   ├── sequential-thinking      → operations::thinking
//!   ├── gcp-provision            → operations::provision
//!   └── analyze-findings         → operations::analyze
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{GetGuideParams, WidescreenResearchParams};
pub use server::{CollaboratorFactory, OrchestratorHandle, WidescreenServer};
pub use transport::{serve_http, serve_stdio};
