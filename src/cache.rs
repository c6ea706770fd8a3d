// src/cache.rs
//
// Durable key→value store contract plus the two bundled implementations.
// All cross-invocation memory of the trigger pipeline lives here, under one
// namespace per trigger identity; namespaces for distinct triggers are
// disjoint and the pipeline assumes at most one concurrent run per namespace.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::Mutex;

/// Namespaced durable store. Values are JSON; `get` of a never-written field
/// returns `None`. Must survive process restarts for the same namespace+field
/// (the in-memory impl is for tests and single-process embedding).
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, namespace: &str, field: &str) -> Result<Option<Value>>;
    async fn set(&self, namespace: &str, field: &str, value: Value) -> Result<()>;
}

/// Cache handle bound to one namespace; this is what adapters see.
#[derive(Clone)]
pub struct ScopedCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
}

impl ScopedCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn get(&self, field: &str) -> Result<Option<Value>> {
        self.store.get(&self.namespace, field).await
    }

    pub async fn set(&self, field: &str, value: Value) -> Result<()> {
        self.store.set(&self.namespace, field, value).await
    }
}

/// Mutex-guarded map. Not durable; intended for tests and embedders that
/// manage persistence themselves.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, namespace: &str, field: &str) -> Result<Option<Value>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .get(namespace)
            .and_then(|fields| fields.get(field))
            .cloned())
    }

    async fn set(&self, namespace: &str, field: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .entry(namespace.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }
}

/// One JSON object file per namespace under `root`. Read-modify-write on
/// every `set`; callers serialize per namespace, so no file locking here.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{}.json", slug(namespace)))
    }

    async fn read_fields(&self, namespace: &str) -> HashMap<String, Value> {
        match tokio::fs::read_to_string(self.path_for(namespace)).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }
}

// Explicit trigger ids come from user config and may hold arbitrary bytes;
// flatten anything non-filename-safe.
fn slug(namespace: &str) -> String {
    namespace
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl CacheStore for FileCache {
    async fn get(&self, namespace: &str, field: &str) -> Result<Option<Value>> {
        Ok(self.read_fields(namespace).await.get(field).cloned())
    }

    async fn set(&self, namespace: &str, field: &str, value: Value) -> Result<()> {
        let mut fields = self.read_fields(namespace).await;
        fields.insert(field.to_string(), value);

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating cache dir {}", self.root.display()))?;
        let path = self.path_for(namespace);
        let body = serde_json::to_vec_pretty(&fields).context("serializing cache namespace")?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing cache file {}", path.display()))?;
        Ok(())
    }
}
