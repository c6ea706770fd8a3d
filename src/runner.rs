// src/runner.rs
//
// The trigger execution pipeline: identity derivation, adapter invocation,
// interval gating, deduplication, output bounding, first-run suppression,
// and the cache writes that make all of it hold across stateless
// invocations.
//
// Cache-state lifecycle rules worth keeping in view:
// - the interval-gate anchor (`lastUpdatedAt`) always advances to the time
//   of the most recent check, even when the gate stays closed, so windows
//   measure "time since last check";
// - a batch discarded by a closed gate is gone for good (the source gets
//   re-polled);
// - keys of items dropped by `max_items_count` are never recorded, so those
//   items may resurface in a later run.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::adapters::{AdapterContext, HttpFetch};
use crate::cache::{CacheStore, ScopedCache};
use crate::digest::content_digest;
use crate::registry;
use crate::types::{Item, RunContext, RunError, TriggerId, TriggerRunResult, TriggerSpec};

/// Upper bound on the persisted per-trigger dedup key list. Oldest keys are
/// evicted first; eviction is a size policy, not a completeness guarantee.
pub const DEFAULT_MAX_DEDUP_KEYS: usize = 1000;

const LAST_UPDATED_AT: &str = "lastUpdatedAt";
const DEDUPLICATION_KEYS: &str = "deduplicationKeys";

/// One-time metrics registration (so series show up wherever an exporter is
/// installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("flowpoll_runs_total", "Trigger evaluations started.");
        describe_counter!(
            "flowpoll_unknown_kind_total",
            "Evaluations skipped for an unregistered trigger kind."
        );
        describe_counter!(
            "flowpoll_soft_fails_total",
            "Adapter request/parse failures downgraded to zero items."
        );
        describe_counter!(
            "flowpoll_gate_skips_total",
            "Batches discarded by a closed interval gate."
        );
        describe_counter!(
            "flowpoll_dedup_filtered_total",
            "Items suppressed by the persisted dedup key list."
        );
        describe_counter!(
            "flowpoll_truncated_total",
            "Items dropped by the max_items_count bound."
        );
        describe_counter!("flowpoll_items_emitted_total", "Items emitted to the caller.");
    });
}

pub struct TriggerRunner {
    cache: Arc<dyn CacheStore>,
    http: Arc<dyn HttpFetch>,
    max_dedup_keys: usize,
}

impl TriggerRunner {
    pub fn new(cache: Arc<dyn CacheStore>, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            cache,
            http,
            max_dedup_keys: DEFAULT_MAX_DEDUP_KEYS,
        }
    }

    /// Override the persisted dedup key bound. The default matches the
    /// historical behavior; lowering it makes old keys resurface sooner.
    pub fn with_max_dedup_keys(mut self, max: usize) -> Self {
        self.max_dedup_keys = max;
        self
    }

    /// Evaluate one trigger against the wall clock.
    pub async fn run(
        &self,
        spec: &TriggerSpec,
        context: &RunContext,
    ) -> Result<TriggerRunResult, RunError> {
        self.run_at(spec, context, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Evaluate one trigger at an explicit time. `now_ms` only feeds the
    /// interval gate; adapters still see the real world.
    pub async fn run_at(
        &self,
        spec: &TriggerSpec,
        context: &RunContext,
        now_ms: i64,
    ) -> Result<TriggerRunResult, RunError> {
        ensure_metrics_described();
        counter!("flowpoll_runs_total").increment(1);

        let id = TriggerId::derive(spec);
        let adapter = match registry::resolve(&spec.kind) {
            Some(adapter) => adapter,
            None => {
                tracing::warn!(kind = %spec.kind, trigger = %id, "unsupported trigger kind");
                counter!("flowpoll_unknown_kind_total").increment(1);
                return Ok(TriggerRunResult::empty(id));
            }
        };

        let cache = ScopedCache::new(self.cache.clone(), id.namespace());
        let adapter_ctx = AdapterContext {
            options: &spec.options,
            path: &spec.path,
            cache: cache.clone(),
            http: self.http.clone(),
            context,
        };
        let output = adapter.run(&adapter_ctx).await?;
        if output.soft_fail.is_some() {
            counter!("flowpoll_soft_fails_total").increment(1);
        }

        let mut result = TriggerRunResult {
            id: id.clone(),
            items: Vec::new(),
            soft_fail: output.soft_fail,
        };
        let mut items = output.items;
        if items.is_empty() {
            // No new data: leave the cache untouched.
            return Ok(result);
        }

        // Gate anchor from before this run; also decides skip-first below.
        let last_updated_at = cache
            .get(LAST_UPDATED_AT)
            .await
            .map_err(RunError::Cache)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        if let Some(minutes) = output.update_interval {
            let next_allowed = last_updated_at + minutes as i64 * 60_000;
            // The anchor advances on every check, open or closed.
            cache
                .set(LAST_UPDATED_AT, Value::from(now_ms))
                .await
                .map_err(RunError::Cache)?;
            if now_ms < next_allowed {
                tracing::debug!(
                    trigger = %id,
                    next_allowed,
                    now_ms,
                    "interval gate closed, discarding batch"
                );
                counter!("flowpoll_gate_skips_total").increment(1);
                return Ok(result);
            }
        }

        if output.should_deduplicate {
            let key_of = |item: &Item| -> String {
                match &output.item_key {
                    Some(f) => f(item),
                    None => default_item_key(item),
                }
            };

            // Collapse duplicate keys within the batch: first occurrence
            // fixes the position, last occurrence supplies the item.
            let mut order: Vec<String> = Vec::new();
            let mut by_key: HashMap<String, Item> = HashMap::new();
            for item in items {
                let key = key_of(&item);
                if !by_key.contains_key(&key) {
                    order.push(key.clone());
                }
                by_key.insert(key, item);
            }

            let seen: Vec<String> = cache
                .get(DEDUPLICATION_KEYS)
                .await
                .map_err(RunError::Cache)?
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .unwrap_or_default();

            let mut fresh: Vec<(String, Item)> = Vec::new();
            let mut filtered = 0u64;
            for key in order {
                if seen.iter().any(|k| *k == key) {
                    filtered += 1;
                    continue;
                }
                if let Some(item) = by_key.remove(&key) {
                    fresh.push((key, item));
                }
            }
            counter!("flowpoll_dedup_filtered_total").increment(filtered);

            if let Some(max) = spec.max_items_count() {
                if fresh.len() > max {
                    // Keys of dropped items are not recorded; they may come
                    // back as "new" in a later run.
                    counter!("flowpoll_truncated_total").increment((fresh.len() - max) as u64);
                    fresh.truncate(max);
                }
            }

            if !fresh.is_empty() {
                let mut keys = seen;
                keys.extend(fresh.iter().map(|(key, _)| key.clone()));
                if keys.len() > self.max_dedup_keys {
                    let excess = keys.len() - self.max_dedup_keys;
                    keys.drain(0..excess);
                }
                cache
                    .set(DEDUPLICATION_KEYS, Value::from(keys))
                    .await
                    .map_err(RunError::Cache)?;
            }

            items = fresh.into_iter().map(|(_, item)| item).collect();
        }

        if spec.skip_first() && last_updated_at == 0 {
            // First-ever run: the cache writes above stand, so this batch is
            // remembered as seen, but nothing is emitted downstream.
            tracing::debug!(trigger = %id, "skip_first active, suppressing bootstrap batch");
            return Ok(result);
        }

        counter!("flowpoll_items_emitted_total").increment(items.len() as u64);
        result.items = items;
        Ok(result)
    }

    /// Evaluate a batch of triggers sequentially, isolating each trigger's
    /// outcome so one fatal error never poisons its siblings.
    pub async fn run_all(
        &self,
        specs: &[TriggerSpec],
        context: &RunContext,
    ) -> Vec<Result<TriggerRunResult, RunError>> {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let outcome = self.run(spec, context).await;
            if let Err(e) = &outcome {
                tracing::error!(kind = %spec.kind, path = %spec.path, error = %e, "trigger failed");
            }
            results.push(outcome);
        }
        results
    }
}

/// Default dedup key: the item's `guid` field, else `id`, else the content
/// digest of the whole item. Non-string scalars stringify.
pub fn default_item_key(item: &Item) -> String {
    for field in ["guid", "id"] {
        if let Some(key) = item.get(field).and_then(scalar_key) {
            return key;
        }
    }
    content_digest(&Value::Object(item.clone()))
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
