// tests/telegram_trigger.rs

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{runner, spec, MockHttp};
use flowpoll::{MemoryCache, RunContext};

const T0: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

fn updates() -> serde_json::Value {
    json!({
        "ok": true,
        "result": [
            {"update_id": 500, "message": {"text": "hello", "chat": {"id": 9}}},
            {"update_id": 501, "message": {"photo": [{"file_id": "p"}], "chat": {"id": 9}}},
            {"update_id": 502, "message": {"document": {"file_id": "d"}, "chat": {"id": 9}}}
        ]
    })
}

#[tokio::test]
async fn events_allowlist_filters_messages() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec(
        "telegram_bot",
        "wf/bot.toml",
        json!({"token": "tok", "events": ["text", "document"]}),
    );

    http.push_json(&updates());
    let result = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0]["update_id"], 500);
    assert_eq!(result.items[1]["update_id"], 502);

    let req = &http.requests.lock().unwrap()[0];
    assert_eq!(req.url, "https://api.telegram.org/bottok/getUpdates");
}

#[tokio::test]
async fn singular_event_option_works_like_a_one_entry_allowlist() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec(
        "telegram_bot",
        "wf/bot.toml",
        json!({"token": "tok", "event": "photo"}),
    );

    http.push_json(&updates());
    let result = runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0]["update_id"], 501);
}

#[tokio::test]
async fn default_interval_gates_rapid_rechecks() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec("telegram_bot", "wf/bot.toml", json!({"token": "tok"}));
    let ctx = RunContext::default();

    http.push_json(&updates());
    assert_eq!(runner.run_at(&spec, &ctx, T0).await.unwrap().items.len(), 3);

    // One minute later: the default 5-minute window is still closed.
    http.push_json(&updates());
    assert!(runner
        .run_at(&spec, &ctx, T0 + MINUTE)
        .await
        .unwrap()
        .items
        .is_empty());

    // Past the window the same updates are all deduplicated by update_id.
    http.push_json(&updates());
    assert!(runner
        .run_at(&spec, &ctx, T0 + 7 * MINUTE)
        .await
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn passthrough_options_become_query_parameters() {
    let cache = Arc::new(MemoryCache::new());
    let http = Arc::new(MockHttp::new());
    let runner = runner(cache, http.clone());
    let spec = spec(
        "telegram_bot",
        "wf/bot.toml",
        json!({"token": "tok", "offset": 42, "allowed_updates": ["message"]}),
    );

    http.push_json(&json!({"ok": true, "result": []}));
    runner
        .run_at(&spec, &RunContext::default(), T0)
        .await
        .unwrap();

    let requests = http.requests.lock().unwrap();
    let query = &requests[0].query;
    assert!(query.contains(&("offset".to_string(), "42".to_string())));
    // Non-scalar options are not forwardable as query parameters.
    assert!(!query.iter().any(|(k, _)| k == "allowed_updates"));
}
