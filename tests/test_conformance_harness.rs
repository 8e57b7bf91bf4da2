//! Conformance harness tests
//!
//! The live suite needs a running Qdrant and is ignored by default:
//!
//! ```text
//! QDRANT_URL=http://localhost:6333 cargo test --test test_conformance_harness -- --ignored
//! ```

use code_snippet_mcp::harness::{ConformanceHarness, HarnessOptions, RunOutcome};
use code_snippet_mcp::vector_store::{MemoryBackend, VectorStoreBackend};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

const MISSING_COLLECTION_PATH: &str = r"^/collections/conformance_test_missing_[0-9a-f]+$";

fn options(url: &str) -> HarnessOptions {
    let mut options = HarnessOptions::new(url);
    options.retry_attempts = 1;
    options.request_timeout = Duration::from_secs(2);
    options
}

#[tokio::test]
async fn test_unreachable_server_skips_data_steps() {
    let harness = ConformanceHarness::new(options("http://127.0.0.1:1")).unwrap();
    let report = harness.run().await;

    let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "health",
            "create_collection",
            "reject_invalid_config",
            "error_format",
            "cleanup"
        ]
    );
    assert!(report.steps.iter().all(|s| !s.passed));
    assert!(report.steps.iter().all(|s| s.error.is_some()));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_auth_step_only_runs_with_api_key() {
    let mut opts = options("http://127.0.0.1:1");
    opts.api_key = Some("secret".to_string());
    opts.skip_cleanup = true;

    let report = ConformanceHarness::new(opts).unwrap().run().await;

    assert!(report.step("auth").is_some());
    assert!(report.step("cleanup").is_none());
}

#[tokio::test]
async fn test_health_step_against_mock() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/healthz")
        .with_status(200)
        .with_body("healthz check passed")
        .create_async()
        .await;

    let mut opts = options(&server.url());
    opts.skip_cleanup = true;
    let report = ConformanceHarness::new(opts).unwrap().run().await;

    assert!(report.step("health").unwrap().passed);
    // Nothing else is mocked, so collection creation fails
    assert!(!report.step("create_collection").unwrap().passed);
    assert!(report.step("insert_points").is_none());
}

/// Accepts connections and never answers
fn silent_server() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    url
}

#[tokio::test]
async fn test_every_step_passes_against_conforming_backend() {
    let mut server = mockito::Server::new_async().await;
    let not_found = server
        .mock("GET", Matcher::Regex(MISSING_COLLECTION_PATH.to_string()))
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":{"error":"Not found: Collection doesn't exist!"},"time":0.0}"#)
        .create_async()
        .await;

    let backend = Arc::new(MemoryBackend::new());
    let mut opts = options(&server.url());
    opts.collection = "conformance_test".to_string();
    let harness = ConformanceHarness::with_backend(opts, backend.clone()).unwrap();

    let outcome = harness.run_with_timeout(Duration::from_secs(30)).await;
    let RunOutcome::Completed(report) = &outcome else {
        panic!("suite timed out: {:?}", outcome);
    };

    let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "health",
            "create_collection",
            "reject_invalid_config",
            "insert_points",
            "reject_invalid_point",
            "search",
            "filtered_search",
            "concurrent_insert",
            "error_format",
            "cleanup"
        ]
    );
    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
    assert_eq!(outcome.exit_code(), 0);

    // cleanup dropped the collection
    assert!(backend.collection_info("conformance_test").await.unwrap().is_none());
    not_found.assert_async().await;
}

#[tokio::test]
async fn test_error_format_requires_json_status_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(MISSING_COLLECTION_PATH.to_string()))
        .with_status(404)
        .with_body("404 page not found")
        .create_async()
        .await;

    let mut opts = options(&server.url());
    opts.collection = "conformance_test".to_string();
    let report = ConformanceHarness::with_backend(opts, Arc::new(MemoryBackend::new()))
        .unwrap()
        .run()
        .await;

    let step = report.step("error_format").unwrap();
    assert!(!step.passed);
    assert!(step.error.as_deref().unwrap().contains("not JSON"));
    assert!(report.step("cleanup").unwrap().passed);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_suite_timeout_exits_with_code_two() {
    let mut opts = options(&silent_server());
    opts.request_timeout = Duration::from_millis(300);
    let harness = ConformanceHarness::new(opts).unwrap();

    let outcome = harness.run_with_timeout(Duration::from_millis(100)).await;

    assert!(matches!(outcome, RunOutcome::TimedOut { .. }));
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test]
#[ignore = "requires a running Qdrant instance"]
async fn test_live_qdrant_conformance() {
    let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string());
    let mut opts = HarnessOptions::new(url);
    opts.api_key = std::env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty());

    let report = ConformanceHarness::new(opts).unwrap().run().await;
    println!("{}", report);

    assert!(report.passed(), "failed steps: {:?}", report.failed_steps());
}
