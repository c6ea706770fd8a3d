// src/types.rs
//
// Data model shared between the runner, the registry, and the adapters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::digest::content_digest;

/// One discovered event. Producer-defined shape; the pipeline never mutates
/// an item after the adapter hands it over.
pub type Item = Map<String, Value>;

/// A configured trigger instance from user workflow config. Immutable input
/// to the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Trigger kind name, e.g. `rss` or `telegram_bot`.
    pub kind: String,
    /// Adapter options; also carries the pipeline options `id`,
    /// `max_items_count` and `skip_first`.
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Workflow-relative path of the declaring file.
    pub path: String,
}

impl TriggerSpec {
    fn option_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(Value::as_str)
    }

    pub fn max_items_count(&self) -> Option<usize> {
        self.options
            .get("max_items_count")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }

    pub fn skip_first(&self) -> bool {
        self.options
            .get("skip_first")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Stable identity of a trigger across runs; names its cache namespace.
///
/// A pure function of {explicit `options.id`, kind, path}: an explicit id
/// wins (two specs sharing an id deliberately share dedup state), otherwise
/// the id is the content digest of kind + path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(String);

impl TriggerId {
    pub fn derive(spec: &TriggerSpec) -> Self {
        if let Some(id) = spec.option_str("id") {
            return Self(id.to_string());
        }
        Self(content_digest(&serde_json::json!({
            "kind": spec.kind,
            "path": spec.path,
        })))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache namespace for this trigger.
    pub fn namespace(&self) -> String {
        format!("trigger-{}", self.0)
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Adapter-supplied dedup key extraction.
pub type ItemKeyFn = Box<dyn Fn(&Item) -> String + Send + Sync>;

/// What an adapter hands back to the runner: raw items plus its policy flags.
pub struct AdapterOutput {
    pub items: Vec<Item>,
    /// Whether the runner should apply the deduplication filter.
    pub should_deduplicate: bool,
    /// Minimum minutes between emissions; `None` disables the interval gate.
    pub update_interval: Option<u64>,
    /// Adapter-specific dedup key extraction; `None` uses the default
    /// guid → id → content-digest fallback.
    pub item_key: Option<ItemKeyFn>,
    /// Set when a request/parse failure was soft-handled as "zero new
    /// items", so callers can still observe it.
    pub soft_fail: Option<String>,
}

impl AdapterOutput {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            should_deduplicate: false,
            update_interval: None,
            item_key: None,
            soft_fail: None,
        }
    }
}

/// Output of one trigger evaluation. `soft_fail` carries a description of a
/// recoverable adapter failure that was downgraded to "no new items".
#[derive(Debug, Clone, Serialize)]
pub struct TriggerRunResult {
    pub id: TriggerId,
    pub items: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_fail: Option<String>,
}

impl TriggerRunResult {
    pub fn empty(id: TriggerId) -> Self {
        Self {
            id,
            items: Vec::new(),
            soft_fail: None,
        }
    }
}

/// Fatal trigger evaluation errors. Recoverable conditions never show up
/// here; they surface as [`TriggerRunResult::soft_fail`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("missing required trigger option `{name}`")]
    MissingConfig { name: String },
    #[error(
        "it was not possible to connect to the URL, please make sure the URL \"{url}\" is valid"
    )]
    Unreachable { url: String },
    #[error("cache error: {0}")]
    Cache(anyhow::Error),
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

/// Opaque execution context handed through to adapters. Carries the webhook
/// deliveries the (external) ingestion endpoint queued for this invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    #[serde(default)]
    pub webhook_deliveries: Vec<WebhookDelivery>,
}

/// One delivery posted to a pre-registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// Workflow-relative path the delivery was addressed to.
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    pub body: Value,
}

fn default_method() -> String {
    "POST".to_string()
}
