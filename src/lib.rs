// src/lib.rs
// Public library surface for integration tests (and for embedding the
// trigger pipeline in a host scheduler).

pub mod adapters;
pub mod cache;
pub mod digest;
pub mod registry;
pub mod runner;
pub mod types;
pub mod workflow;

// ---- Re-exports for stable public API ----
pub use crate::cache::{CacheStore, FileCache, MemoryCache, ScopedCache};
pub use crate::digest::content_digest;
pub use crate::runner::{default_item_key, TriggerRunner, DEFAULT_MAX_DEDUP_KEYS};
pub use crate::types::{
    AdapterOutput, Item, RunContext, RunError, TriggerId, TriggerRunResult, TriggerSpec,
    WebhookDelivery,
};
