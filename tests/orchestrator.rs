//! End-to-end orchestrator scenarios over stubbed collaborators and
//! wiremock worker endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use widescreen_rs::core::SessionStatus;
use widescreen_rs::orchestrator::MockPlanner;

use common::{
    StubHost, default_planner, fast_timing, fixture, no_websets, publish_results,
    research_config, worker_result,
};

async fn worker_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instructions"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_happy_path_completes_with_report() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    publish_results(
        fx.bus.clone(),
        "sess-happy",
        vec![
            worker_result("sess-happy", 0, "completed"),
            worker_result("sess-happy", 1, "completed"),
            worker_result("sess-happy", 2, "completed"),
        ],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-happy", 3))
        .await
        .expect("run_research");

    assert_eq!(result.status, SessionStatus::Completed);
    assert_eq!(result.metrics.workers_provisioned, 3);
    assert_eq!(result.metrics.workers_completed, 3);
    assert_eq!(result.metrics.workers_failed, 0);
    assert!(result.report_url.is_some());
    let report = result.report_data.expect("report data");
    assert_eq!(report["metadata"]["research_topic"], "topic for sess-happy");

    // Cleanup invariant: every provisioned worker deleted exactly once.
    let mut created = host.created();
    let mut deleted = host.deleted();
    created.sort();
    deleted.sort();
    assert_eq!(created.len(), 3);
    assert_eq!(created, deleted);
    assert_eq!(fx.orchestrator.active_sessions().await, 0);

    // Artifacts on disk.
    let root = fx.reports_dir.path();
    assert!(root.join("report_sess-happy.md").exists());
    assert!(root.join("progress_sess-happy.md").exists());
    assert!(root.join("results_sess-happy/drone_drone-sess-happy-0.json").exists());

    // Report persisted to the document store.
    assert_eq!(fx.store.len().await, 1);

    // Each worker got exactly one instruction.
    let instruction_posts = workers
        .received_requests()
        .await
        .expect("requests")
        .iter()
        .filter(|r| r.url.path() == "/instructions")
        .count();
    assert_eq!(instruction_posts, 3);
}

#[tokio::test]
async fn test_planner_undercount_shrinks_fleet() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let planner = Arc::new(MockPlanner::new().with_fixture(
        "topic for sess-under",
        vec!["q1".to_string(), "q2".to_string()],
    ));
    let fx = fixture(
        host.clone(),
        planner,
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    // Only two results are needed even though three researchers were
    // requested.
    publish_results(
        fx.bus.clone(),
        "sess-under",
        vec![
            worker_result("sess-under", 0, "completed"),
            worker_result("sess-under", 1, "completed"),
        ],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-under", 3))
        .await
        .expect("run_research");

    assert_eq!(result.status, SessionStatus::Completed);
    assert_eq!(result.metrics.workers_provisioned, 2);
    assert_eq!(host.created().len(), 2);
    assert_eq!(host.deleted().len(), 2);
}

#[tokio::test]
async fn test_timeout_fails_session_and_saves_partial_results() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_millis(300)),
    );

    // Two of three results arrive; the third worker never reports.
    publish_results(
        fx.bus.clone(),
        "sess-slow",
        vec![
            worker_result("sess-slow", 0, "completed"),
            worker_result("sess-slow", 1, "completed"),
        ],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-slow", 3))
        .await
        .expect("run_research resolves timeouts into a payload");

    assert_eq!(result.status, SessionStatus::Timeout);
    assert_eq!(result.metrics.workers_provisioned, 3);
    assert_eq!(result.metrics.workers_completed, 2);
    assert!(result.report_data.is_none());

    // All three workers torn down; partial results saved as artifacts.
    assert_eq!(host.deleted().len(), 3);
    let results_dir = fx.reports_dir.path().join("results_sess-slow");
    assert!(results_dir.join("drone_drone-sess-slow-0.json").exists());
    assert!(results_dir.join("drone_drone-sess-slow-1.json").exists());
    assert!(!results_dir.join("drone_drone-sess-slow-2.json").exists());
}

#[tokio::test]
async fn test_duplicate_worker_results_both_counted() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    // The same worker reports twice; the duplicate also counts toward
    // completion.
    publish_results(
        fx.bus.clone(),
        "sess-dup",
        vec![
            worker_result("sess-dup", 0, "completed"),
            worker_result("sess-dup", 0, "completed"),
        ],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-dup", 2))
        .await
        .expect("run_research");

    assert_eq!(result.status, SessionStatus::Completed);
    assert_eq!(result.metrics.workers_completed, 2);
    assert_eq!(result.metrics.data_points_collected, 4);
}

#[tokio::test]
async fn test_failed_worker_counts_toward_completion() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    publish_results(
        fx.bus.clone(),
        "sess-mixed",
        vec![
            worker_result("sess-mixed", 0, "completed"),
            worker_result("sess-mixed", 1, "failed"),
        ],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-mixed", 2))
        .await
        .expect("run_research");

    // Partial failure is not an error; it lands in the metrics.
    assert_eq!(result.status, SessionStatus::Completed);
    assert_eq!(result.metrics.workers_completed, 1);
    assert_eq!(result.metrics.workers_failed, 1);
}

#[tokio::test]
async fn test_provisioning_failure_fails_session_and_cleans_up() {
    let workers = worker_server().await;
    let host = StubHost::failing(workers.uri(), &["-1"]);
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-prov", 2))
        .await
        .expect("failure resolves into a payload");

    assert_eq!(result.status, SessionStatus::Failed);
    // The worker that did come up is deleted exactly once.
    assert_eq!(host.created(), vec!["drone-sess-prov-0".to_string()]);
    assert_eq!(host.deleted(), vec!["drone-sess-prov-0".to_string()]);
    assert_eq!(fx.orchestrator.active_sessions().await, 0);
}

#[tokio::test]
async fn test_dispatch_failure_is_not_fatal() {
    // Workers reject instructions, but results still arrive over the
    // bus (at-least-once delivery does not depend on dispatch).
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instructions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let host = StubHost::new(server.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    publish_results(
        fx.bus.clone(),
        "sess-nodispatch",
        vec![worker_result("sess-nodispatch", 0, "completed")],
    );

    let result = fx
        .orchestrator
        .run_research(research_config("sess-nodispatch", 1))
        .await
        .expect("run_research");

    assert_eq!(result.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_invalid_config_rejected_before_session() {
    let workers = worker_server().await;
    let host = StubHost::new(workers.uri());
    let fx = fixture(
        host.clone(),
        default_planner(),
        no_websets(),
        fast_timing(Duration::from_secs(10)),
    );

    let mut config = research_config("sess-bad", 3);
    config.topic = String::new();
    let err = fx.orchestrator.run_research(config).await;
    assert!(err.is_err());
    assert!(host.created().is_empty());
}
