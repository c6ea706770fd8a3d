// tests/file_cache.rs
//
// Durability contract of the file-backed cache: state written by one
// process-lifetime (handle) is visible to the next.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{spec, MockHttp};
use flowpoll::{CacheStore, FileCache, RunContext, TriggerRunner};

const T0: i64 = 1_700_000_000_000;

#[tokio::test]
async fn fields_survive_a_fresh_handle() {
    let dir = tempfile::tempdir().unwrap();

    let cache = FileCache::new(dir.path());
    cache
        .set("trigger-x", "lastUpdatedAt", json!(123))
        .await
        .unwrap();
    cache
        .set("trigger-x", "deduplicationKeys", json!(["a", "b"]))
        .await
        .unwrap();

    let reopened = FileCache::new(dir.path());
    assert_eq!(
        reopened.get("trigger-x", "lastUpdatedAt").await.unwrap(),
        Some(json!(123))
    );
    assert_eq!(
        reopened
            .get("trigger-x", "deduplicationKeys")
            .await
            .unwrap(),
        Some(json!(["a", "b"]))
    );
    assert_eq!(reopened.get("trigger-y", "lastUpdatedAt").await.unwrap(), None);
}

#[tokio::test]
async fn dedup_state_carries_across_runner_instances() {
    let dir = tempfile::tempdir().unwrap();
    let spec = spec("poll", "wf/a.toml", json!({"url": "https://example.test/api"}));
    let ctx = RunContext::default();
    let batch = json!([{"id": "1"}, {"id": "2"}]);

    // First stateless invocation.
    {
        let http = Arc::new(MockHttp::new());
        http.push_json(&batch);
        let runner = TriggerRunner::new(Arc::new(FileCache::new(dir.path())), http);
        assert_eq!(runner.run_at(&spec, &ctx, T0).await.unwrap().items.len(), 2);
    }

    // Second invocation, brand-new runner and cache handle, same directory.
    {
        let http = Arc::new(MockHttp::new());
        http.push_json(&batch);
        let runner = TriggerRunner::new(Arc::new(FileCache::new(dir.path())), http);
        assert!(runner
            .run_at(&spec, &ctx, T0 + 1)
            .await
            .unwrap()
            .items
            .is_empty());
    }
}
