//! MCP tool parameter types.
//!
//! All `widescreen_research` parameters are strings so the generated
//! JSON schema stays trivially stable across MCP clients; operation
//! payloads travel JSON-encoded inside `parameters_json` and
//! `elicitation_answers_json` and are decoded past the dispatch
//! boundary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `widescreen_research` MCP tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WidescreenResearchParams {
    /// Operation to execute. Empty or `start` begins elicitation; the
    /// others are `orchestrate-research`, `sequential-thinking`,
    /// `gcp-provision`, `analyze-findings`, `websets-orchestrate`, and
    /// `websets-call`.
    #[serde(default)]
    pub operation: String,

    /// Session id for follow-up elicitation calls and for
    /// `orchestrate-research`.
    #[serde(default)]
    pub session_id: String,

    /// JSON-encoded parameters for the operation.
    #[serde(default)]
    pub parameters_json: String,

    /// JSON-encoded answer map for elicitation steps.
    #[serde(default)]
    pub elicitation_answers_json: String,
}

/// Parameters for the `get_guide` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetGuideParams {
    /// Guide name: `main`, `websets`, `orchestration`, `quickstart`, or
    /// `list` to see all.
    #[serde(default = "default_guide_name")]
    pub name: String,
}

fn default_guide_name() -> String {
    "main".to_string()
}

/// Payload of `parameters_json` for `websets-orchestrate`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebsetsOrchestrateParams {
    /// Search topic.
    pub topic: String,
    /// How many content items to request.
    #[serde(default = "default_result_count")]
    pub result_count: usize,
}

fn default_result_count() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_params_all_optional() {
        let params: WidescreenResearchParams =
            serde_json::from_str("{}").unwrap_or_else(|_| unreachable!());
        assert!(params.operation.is_empty());
        assert!(params.session_id.is_empty());
    }

    #[test]
    fn test_guide_name_defaults_to_main() {
        let params: GetGuideParams = serde_json::from_str("{}").unwrap_or_else(|_| unreachable!());
        assert_eq!(params.name, "main");
    }

    #[test]
    fn test_websets_result_count_default() {
        let params: WebsetsOrchestrateParams =
            serde_json::from_str(r#"{"topic": "t"}"#).unwrap_or_else(|_| unreachable!());
        assert_eq!(params.result_count, 50);
    }
}
