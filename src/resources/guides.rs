//! Embedded Markdown guides served by the `get_guide` tool.

/// Lookup over the compiled-in guides.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuideLibrary;

impl GuideLibrary {
    /// Creates the library.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the named guide, `None` when unknown.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static str> {
        match name {
            "main" => Some(MAIN_GUIDE),
            "websets" => Some(WEBSETS_GUIDE),
            "orchestration" => Some(ORCHESTRATION_GUIDE),
            "quickstart" => Some(QUICKSTART_GUIDE),
            _ => None,
        }
    }

    /// All guide names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        vec!["main", "orchestration", "quickstart", "websets"]
    }
}

const MAIN_GUIDE: &str = r#"# Widescreen Research System Guide

Widescreen research orchestrates a fleet of short-lived research workers
(drones) against a single topic and folds their findings into one report.

## How a session works

1. Call `widescreen_research` with no operation (or `operation=start`).
   You receive a session id and the first question set.
2. Answer the questions by calling again with the same `session_id` and
   `elicitation_answers_json`. Three rounds of answers complete the
   configuration: topic and fleet size, output format, then timeout and
   priority.
3. Call with `operation=orchestrate-research` and the session id. The
   server plans sub-queries, provisions one worker per sub-query,
   collects results over the message bus, and returns a
   `ResearchResult` with the report and metrics.

## Operations

| Operation | Purpose |
|---|---|
| (empty) / `start` | Elicitation: configure a research session |
| `orchestrate-research` | Run the configured fleet pipeline |
| `websets-orchestrate` | Run the websets content pipeline |
| `websets-call` | Raw call to the websets manager tool |
| `sequential-thinking` | Stepwise reasoning scaffold |
| `gcp-provision` | Provision workers or topics directly |
| `analyze-findings` | Analyze previously collected results |

## Artifacts

Every session writes under the reports directory:

- `progress_<session>.md`: live status, refreshed on every change
- `report_<session>.md`: the final rendered report
- `results_<session>/drone_<worker>.json`: raw per-worker output
"#;

const WEBSETS_GUIDE: &str = r#"# Websets Workflow

The websets pipeline aggregates web content through the external websets
service, reached as an MCP server running as a child process.

## Requirements

Set `EXA_API_KEY` in the server's environment. The child process is
spawned on first use; override the command with `WIDESCREEN_WEBSETS_BIN`
and `WIDESCREEN_WEBSETS_ARGS`.

## Pipeline

`operation=websets-orchestrate` with `parameters_json`:

```json
{"topic": "quantum computing 2024", "result_count": 50}
```

The server then:

1. creates a webset for the topic,
2. polls its status every 10 seconds until `completed`,
3. lists the content items,
4. publishes each item onto the bus topic `websets-<webset_id>`,
5. returns a result whose `report_data` carries the items and counts.

A webset that reports `status=failed` aborts the pipeline before any
item is published.

## Direct calls

`operation=websets-call` passes `parameters_json` through to the
`websets_manager` tool unchanged, for operations the pipeline does not
cover.
"#;

const ORCHESTRATION_GUIDE: &str = r#"# Orchestration Workflow

The fleet pipeline runs in strict order:

1. **Plan**: the sub-query planner splits the topic into one sub-query
   per requested researcher. Fewer sub-queries shrink the fleet; extras
   are dropped.
2. **Provision**: workers are created in parallel on the compute
   backend. Any creation failure fails the session and deletes the
   workers that did come up.
3. **Dispatch**: each worker receives its sub-query via
   `POST /instructions` (10 s deadline). A dispatch failure marks that
   worker `failed_to_instruct` without aborting the session.
4. **Collect**: workers publish results onto
   `research-results-<session>`; a per-session subscription feeds them
   into the session as they arrive. Health probes run every 10 seconds.
5. **Wait**: the session completes when the collected results reach the
   fleet size, or times out at the configured `timeout_minutes`.
6. **Report**: results are analyzed, assembled into a structured
   report, rendered to Markdown, and persisted.
7. **Cleanup**: workers, the topic, and the subscription are removed
   whether or not the session succeeded.

## Priority levels

| Priority | CPU | Memory |
|---|---|---|
| low | 0.5 | 512 MiB |
| normal | 1.0 | 1 GiB |
| high | 2.0 | 2 GiB |
"#;

const QUICKSTART_GUIDE: &str = r#"# Quickstart

## Configure

```sh
export WIDESCREEN_PROJECT_ID=my-project
export WIDESCREEN_REGION=us-central1        # optional
export WIDESCREEN_REPORTS_DIR=reports       # optional
```

## Serve

```sh
widescreen-rs serve                 # stdio transport
widescreen-rs serve --http 0.0.0.0:8080
```

## First session

1. `widescreen_research` with empty arguments → note the `session_id`
   and answer the topic, researcher count, and depth questions.
2. Two more answer rounds (output format; timeout and priority) until
   the response's `type` is `ready`.
3. `operation=orchestrate-research` with the session id runs the fleet
   and returns the report.

Use `get_guide` with `name=list` to see every guide.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_guides_resolve() {
        let library = GuideLibrary::new();
        for name in library.names() {
            let guide = library.get(name).expect("guide exists");
            assert!(guide.starts_with('#'));
        }
    }

    #[test]
    fn test_unknown_guide() {
        assert!(GuideLibrary::new().get("nope").is_none());
    }
}
