//! Server settings with builder pattern and environment variable support.
//!
//! Settings are resolved in order: explicit values → environment variables → defaults.
//! The project id is deliberately *not* validated here; it is checked when
//! the orchestrator is first constructed so that configuration errors
//! surface to the MCP caller rather than killing the process at startup.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default deployment region.
const DEFAULT_REGION: &str = "us-central1";
/// Default artifact directory for reports and progress files.
const DEFAULT_REPORTS_DIR: &str = "reports";
/// Default websets child binary.
const DEFAULT_WEBSETS_BIN: &str = "exa-websets-mcp-server";
/// Default planner model.
const DEFAULT_PLANNER_MODEL: &str = "gpt-4o-mini";
/// Environment variable holding the websets credential.
pub const WEBSETS_CREDENTIAL_VAR: &str = "EXA_API_KEY";

/// Configuration for the widescreen research server.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Logical cloud project id. Required before any orchestration runs.
    pub project_id: String,
    /// Deployment region for provisioned workers.
    pub region: String,
    /// Container image reference for research workers.
    pub worker_image: String,
    /// Root directory for report and progress artifacts.
    pub reports_dir: PathBuf,
    /// Command used by the local process host to launch a worker.
    pub worker_command: Option<String>,
    /// Binary for the websets MCP child process.
    pub websets_bin: String,
    /// Arguments for the websets MCP child process.
    pub websets_args: Vec<String>,
    /// API key for the LLM-backed sub-query planner. Absent means the
    /// deterministic mock planner is used.
    pub planner_api_key: Option<String>,
    /// Model for the LLM-backed planner.
    pub planner_model: String,
}

impl Settings {
    /// Creates a new builder for `Settings`.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Creates settings from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if no project id is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    project_id: Option<String>,
    region: Option<String>,
    worker_image: Option<String>,
    reports_dir: Option<PathBuf>,
    worker_command: Option<String>,
    websets_bin: Option<String>,
    websets_args: Option<Vec<String>>,
    planner_api_key: Option<String>,
    planner_model: Option<String>,
}

impl SettingsBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.project_id.is_none() {
            self.project_id = std::env::var("WIDESCREEN_PROJECT_ID").ok();
        }
        if self.region.is_none() {
            self.region = std::env::var("WIDESCREEN_REGION").ok();
        }
        if self.worker_image.is_none() {
            self.worker_image = std::env::var("WIDESCREEN_WORKER_IMAGE").ok();
        }
        if self.reports_dir.is_none() {
            self.reports_dir = std::env::var("WIDESCREEN_REPORTS_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.worker_command.is_none() {
            self.worker_command = std::env::var("WIDESCREEN_WORKER_COMMAND").ok();
        }
        if self.websets_bin.is_none() {
            self.websets_bin = std::env::var("WIDESCREEN_WEBSETS_BIN").ok();
        }
        if self.websets_args.is_none() {
            self.websets_args = std::env::var("WIDESCREEN_WEBSETS_ARGS")
                .ok()
                .map(|v| v.split_whitespace().map(str::to_string).collect());
        }
        if self.planner_api_key.is_none() {
            self.planner_api_key = std::env::var("WIDESCREEN_PLANNER_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.planner_model.is_none() {
            self.planner_model = std::env::var("WIDESCREEN_PLANNER_MODEL").ok();
        }
        self
    }

    /// Sets the project id.
    #[must_use]
    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the worker image reference.
    #[must_use]
    pub fn worker_image(mut self, image: impl Into<String>) -> Self {
        self.worker_image = Some(image.into());
        self
    }

    /// Sets the artifact root directory.
    #[must_use]
    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Sets the local worker command.
    #[must_use]
    pub fn worker_command(mut self, command: impl Into<String>) -> Self {
        self.worker_command = Some(command.into());
        self
    }

    /// Sets the websets child binary and arguments.
    #[must_use]
    pub fn websets_command(mut self, bin: impl Into<String>, args: Vec<String>) -> Self {
        self.websets_bin = Some(bin.into());
        self.websets_args = Some(args);
        self
    }

    /// Sets the planner API key.
    #[must_use]
    pub fn planner_api_key(mut self, key: impl Into<String>) -> Self {
        self.planner_api_key = Some(key.into());
        self
    }

    /// Sets the planner model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Builds the [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if no project id was set.
    pub fn build(self) -> Result<Settings, ConfigError> {
        let project_id = self.project_id.ok_or(ConfigError::MissingVar {
            name: "WIDESCREEN_PROJECT_ID",
        })?;

        let worker_image = self
            .worker_image
            .unwrap_or_else(|| format!("gcr.io/{project_id}/research-drone:latest"));

        Ok(Settings {
            project_id,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            worker_image,
            reports_dir: self
                .reports_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
            worker_command: self.worker_command,
            websets_bin: self
                .websets_bin
                .unwrap_or_else(|| DEFAULT_WEBSETS_BIN.to_string()),
            websets_args: self.websets_args.unwrap_or_default(),
            planner_api_key: self.planner_api_key,
            planner_model: self
                .planner_model
                .unwrap_or_else(|| DEFAULT_PLANNER_MODEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let settings = Settings::builder()
            .project_id("test-project")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(settings.project_id, "test-project");
        assert_eq!(settings.region, DEFAULT_REGION);
        assert_eq!(
            settings.worker_image,
            "gcr.io/test-project/research-drone:latest"
        );
        assert_eq!(settings.reports_dir, PathBuf::from("reports"));
        assert_eq!(settings.websets_bin, DEFAULT_WEBSETS_BIN);
        assert!(settings.planner_api_key.is_none());
    }

    #[test]
    fn test_builder_missing_project_id() {
        let result = SettingsBuilder::default().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_custom_values() {
        let settings = Settings::builder()
            .project_id("p")
            .region("europe-west1")
            .worker_image("registry.local/drone:dev")
            .reports_dir("/tmp/reports")
            .websets_command("node", vec!["./build/index.js".to_string()])
            .planner_api_key("key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(settings.region, "europe-west1");
        assert_eq!(settings.worker_image, "registry.local/drone:dev");
        assert_eq!(settings.websets_bin, "node");
        assert_eq!(settings.websets_args, vec!["./build/index.js"]);
        assert!(settings.planner_api_key.is_some());
    }
}
