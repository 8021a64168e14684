//! Markdown rendering of a structured report.
//!
//! A pure transformation: the same report and file list always produce
//! identical bytes.

use crate::core::Report;

/// Renders the user-facing Markdown report.
///
/// `result_files` are the per-worker raw JSON paths relative to the
/// reports root; they are linked from the appendix.
#[must_use]
pub fn render_markdown(report: &Report, result_files: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&format!("**Session ID:** `{}`  \n", report.session_id));
    out.push_str(&format!(
        "**Generated On:** {}\n\n",
        report.created_at.to_rfc2822()
    ));

    out.push_str("## Executive Summary\n\n");
    out.push_str(&report.executive);
    out.push_str("\n\n");

    out.push_str("## Methodology\n\n");
    out.push_str(&report.methodology);
    out.push_str("\n\n");

    for section in &report.sections {
        out.push_str(&format!("## {}\n\n", section.title));
        out.push_str(&section.content);
        out.push_str("\n\n");
        if !section.insights.is_empty() {
            out.push_str("### Key Insights\n\n");
            for insight in &section.insights {
                out.push_str(&format!("- {insight}\n"));
            }
            out.push('\n');
        }
    }

    out.push_str("---\n\n");
    out.push_str("## Appendix: Raw Drone Results\n\n");
    out.push_str("This appendix contains links to the raw JSON output from each research drone.\n\n");
    for path in result_files {
        out.push_str(&format!("- [{path}](./{path})\n"));
    }
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use serde_json::Map;
    use uuid::Uuid;

    use super::*;
    use crate::core::{ReportMetadata, ReportSection, ResearchMetrics};

    fn report() -> Report {
        Report {
            id: Uuid::nil(),
            session_id: "s-1".to_string(),
            title: "Research Report: graphene".to_string(),
            executive: "Summary prose.".to_string(),
            sections: vec![ReportSection {
                title: "Key Findings".to_string(),
                content: "Things were found.".to_string(),
                data: None,
                insights: vec!["insight one".to_string()],
            }],
            methodology: "Distributed drones.".to_string(),
            data: Map::new(),
            metadata: ReportMetadata {
                research_topic: "graphene".to_string(),
                researcher_count: 2,
                duration: Duration::from_secs(60),
                data_points: 2,
                sources: Vec::new(),
                metrics: ResearchMetrics::default(),
            },
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_render_contains_sections_and_appendix() {
        let markdown = render_markdown(&report(), &["results_s-1/drone_a.json".to_string()]);
        assert!(markdown.starts_with("# Research Report: graphene\n"));
        assert!(markdown.contains("**Session ID:** `s-1`"));
        assert!(markdown.contains("## Key Findings"));
        assert!(markdown.contains("### Key Insights\n\n- insight one"));
        assert!(markdown.contains("- [results_s-1/drone_a.json](./results_s-1/drone_a.json)"));
    }

    #[test]
    fn test_render_is_byte_identical() {
        let files = vec!["results_s-1/drone_a.json".to_string()];
        assert_eq!(
            render_markdown(&report(), &files),
            render_markdown(&report(), &files)
        );
    }
}
