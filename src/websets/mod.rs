//! Subprocess MCP client for the external websets service.
//!
//! The websets content-aggregation service is reachable only as an MCP
//! server speaking JSON-RPC over the stdio of a child process. This
//! module owns that child: [`StdioWebsetsClient`] serialises every call
//! through one mutex, recovers from transport-class failures with exactly
//! one reconnect-and-retry, and surfaces tool-level errors verbatim.
//! [`WebsetsOperations`] layers the create → poll → list protocol on top.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   └── WebsetsOperations (create_webset / wait_for_completion / list_content_items)
//!         └── dyn WebsetsClient (serialised calls, one reconnect on transport error)
//!               └── dyn SessionFactory → dyn ToolSession
//!                     └── rmcp client over the child process stdio
//! ```

pub mod client;
pub mod ops;
pub mod session;

pub use client::{StdioWebsetsClient, WebsetsClient};
pub use ops::WebsetsOperations;
pub use session::{SessionError, SessionFactory, StdioSessionFactory, ToolReply, ToolSession};
