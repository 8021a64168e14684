//! Research orchestration.
//!
//! The orchestrator owns each session end to end: it plans sub-queries,
//! provisions a worker fleet, dispatches instructions, collects results
//! off the bus, assembles the report, and tears everything down.
//!
//! # Architecture
//!
//! ```text
//! run_research(config)
//!   ├── SubQueryPlanner (topic → N sub-queries)
//!   ├── FleetProvisioner (parallel WorkerHost.create fan-out)
//!   ├── ResultQueue (bus subscription → channel of WorkerResults)
//!   ├── InstructionClient (POST /instructions, GET /health)
//!   ├── wait loop (5 s poll, session timeout)
//!   ├── report pipeline (analyze → assemble → render)
//!   └── cleanup (delete workers + topic, close queue, drop session)
//! ```

pub mod artifacts;
pub mod dispatch;
pub mod engine;
pub mod planner;
pub mod provisioner;
pub mod queue;
pub mod session;

pub use artifacts::ArtifactWriter;
pub use dispatch::InstructionClient;
pub use engine::{Collaborators, Orchestrator, Timing};
pub use planner::{MockPlanner, OpenAiPlanner, SubQueryPlanner, planner_from_settings};
pub use provisioner::{FleetProvisioner, resource_limits, results_topic, worker_id};
pub use queue::ResultQueue;
pub use session::{SessionState, SharedSession, WorkerInfo};
