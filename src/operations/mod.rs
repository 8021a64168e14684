//! Operation dispatch for the `widescreen_research` tool.
//!
//! The tool's `operation` string is a sum-typed discriminator. Parsing it
//! into [`Operation`] is the single place stringly-typed matching is
//! allowed; everything past this boundary works with the enum and typed
//! parameter envelopes.

pub mod analyze;
pub mod provision;
pub mod thinking;

pub use analyze::{AnalyzeParams, run as run_analyze};
pub use provision::{ProvisionParams, ProvisionResponse, ProvisionedResource, ResourceType};
pub use thinking::{ThinkingParams, ThinkingResponse, ThoughtStep, run as run_thinking};

/// Everything the `widescreen_research` tool can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Begin or continue elicitation (`""` or `"start"`).
    Start,
    /// Run the fleet-based research pipeline.
    OrchestrateResearch,
    /// Stepwise reasoning scaffold.
    SequentialThinking,
    /// Provision compute or bus resources directly.
    GcpProvision,
    /// Analyze caller-supplied worker results.
    AnalyzeFindings,
    /// Run the websets pipeline.
    WebsetsOrchestrate,
    /// Direct pass-through to the websets manager tool.
    WebsetsCall,
}

impl Operation {
    /// Parses the wire operation string. Unknown strings are `None` and
    /// surface as a validation error at the tool boundary.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" | "start" => Some(Self::Start),
            "orchestrate-research" => Some(Self::OrchestrateResearch),
            "sequential-thinking" => Some(Self::SequentialThinking),
            "gcp-provision" => Some(Self::GcpProvision),
            "analyze-findings" => Some(Self::AnalyzeFindings),
            "websets-orchestrate" => Some(Self::WebsetsOrchestrate),
            "websets-call" => Some(Self::WebsetsCall),
            _ => None,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::OrchestrateResearch => "orchestrate-research",
            Self::SequentialThinking => "sequential-thinking",
            Self::GcpProvision => "gcp-provision",
            Self::AnalyzeFindings => "analyze-findings",
            Self::WebsetsOrchestrate => "websets-orchestrate",
            Self::WebsetsCall => "websets-call",
        }
    }
}
