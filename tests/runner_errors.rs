// tests/runner_errors.rs
//
// Error classification: unknown kinds warn and continue, missing config and
// unreachable hosts are fatal, other request failures downgrade to zero
// items with the soft-fail reason preserved.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{runner, spec, MockHttp};
use flowpoll::{MemoryCache, RunContext, RunError};

const T0: i64 = 1_700_000_000_000;

#[tokio::test]
async fn unknown_kind_is_non_fatal() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http);
    let spec = spec("imap", "wf/a.toml", json!({}));

    let result = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();
    assert!(result.items.is_empty());
    assert!(result.soft_fail.is_none());
}

#[tokio::test]
async fn missing_required_option_is_fatal() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http);
    let spec = spec("telegram_bot", "wf/a.toml", json!({"every": 1}));

    let err = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::MissingConfig { ref name } if name == "token"));
}

#[tokio::test]
async fn connection_failure_is_fatal_and_names_the_url() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec("telegram_bot", "wf/a.toml", json!({"token": "tok"}));

    http.push_connect_refused("https://api.telegram.org/bottok/getUpdates");
    let err = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap_err();
    match err {
        RunError::Unreachable { url } => assert!(url.contains("api.telegram.org")),
        other => panic!("expected Unreachable, got {other}"),
    }
}

#[tokio::test]
async fn request_failure_soft_fails_with_reason() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec("poll", "wf/a.toml", json!({"url": "https://example.test/api"}));

    http.push_request_error("timed out");
    let result = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();
    assert!(result.items.is_empty());
    let reason = result.soft_fail.expect("soft fail should be surfaced");
    assert!(reason.contains("timed out"));
}

#[tokio::test]
async fn unparseable_body_soft_fails() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec("poll", "wf/a.toml", json!({"url": "https://example.test/api"}));

    http.push_body("<html>not json</html>");
    let result = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();
    assert!(result.items.is_empty());
    assert!(result.soft_fail.is_some());
}

#[tokio::test]
async fn batch_isolates_a_fatal_sibling() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());

    let broken = spec("telegram_bot", "wf/broken.toml", json!({}));
    let fine = spec("poll", "wf/fine.toml", json!({"url": "https://example.test/api"}));
    http.push_json(&json!([{"id": "1"}]));

    let results = runner
        .run_all(&[broken, fine], &RunContext::default())
        .await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_err());
    assert_eq!(results[1].as_ref().unwrap().items.len(), 1);
}
