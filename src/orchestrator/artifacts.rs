//! Filesystem artifact layout.
//!
//! Every session leaves three kinds of artifacts under the reports root:
//! a mutable progress file (`progress_<session>.md`), the rendered report
//! (`report_<session>.md`), and per-worker raw JSON
//! (`results_<session>/drone_<worker>.json`).

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::core::WorkerResult;

use super::session::SessionState;

/// Writes session artifacts under a configured root directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The artifact root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Renders and writes the progress file for the session.
    ///
    /// Called on every state change and every collected result; readers
    /// are best-effort so write failures are the caller's to log.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn write_progress(&self, state: &SessionState) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let mut content = String::new();
        content.push_str(&format!("# Research Progress: {}\n\n", state.config.topic));
        content.push_str(&format!(
            "**Session ID:** `{}`\n",
            state.config.session_id
        ));
        content.push_str(&format!("**Overall Status:** `{}`\n", state.status));
        content.push_str(&format!(
            "**Last Updated:** {}\n\n",
            Utc::now().to_rfc2822()
        ));

        content.push_str("## Drone Status\n\n");
        content.push_str("| Drone ID | Status |\n");
        content.push_str("|---|---|\n");
        for id in &state.worker_order {
            if let Some(worker) = state.workers.get(id) {
                content.push_str(&format!("| {} | {} |\n", worker.id, worker.status));
            }
        }

        content.push_str(&format!(
            "\n**Results Collected:** {} / {}\n",
            state.results.len(),
            state.target_results
        ));

        let path = self
            .root
            .join(format!("progress_{}.md", state.config.session_id));
        tokio::fs::write(path, content).await
    }

    /// Writes each result's raw JSON and returns the paths relative to
    /// the reports root, in input order. Duplicate worker ids overwrite;
    /// last write wins.
    ///
    /// # Errors
    ///
    /// Returns the first I/O or serialization error.
    pub async fn write_worker_results(
        &self,
        session_id: &str,
        results: &[WorkerResult],
    ) -> io::Result<Vec<String>> {
        let dir_name = format!("results_{session_id}");
        let dir = self.root.join(&dir_name);
        tokio::fs::create_dir_all(&dir).await?;

        let mut relative_paths = Vec::with_capacity(results.len());
        for result in results {
            let file_name = format!("drone_{}.json", result.worker_id);
            let body = serde_json::to_vec_pretty(result)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            tokio::fs::write(dir.join(&file_name), body).await?;

            let relative = format!("{dir_name}/{file_name}");
            if !relative_paths.contains(&relative) {
                relative_paths.push(relative);
            }
        }
        Ok(relative_paths)
    }

    /// Writes the rendered Markdown report and returns its path.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn write_report_markdown(
        &self,
        session_id: &str,
        markdown: &str,
    ) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("report_{session_id}.md"));
        tokio::fs::write(&path, markdown).await?;
        Ok(path)
    }
}
