// src/adapters/webhook.rs
//
// Webhook trigger. The ingestion endpoint itself is an external collaborator;
// by the time this adapter runs, deliveries have been queued on the execution
// context. Each delivery addressed to this trigger's workflow path becomes
// one item.

use serde_json::{Map, Value};

use crate::adapters::{Adapter, AdapterContext};
use crate::types::{AdapterOutput, Item, RunError, WebhookDelivery};

pub struct Webhook;

fn to_item(delivery: &WebhookDelivery) -> Item {
    let mut item = Map::new();
    item.insert("path".to_string(), Value::String(delivery.path.clone()));
    item.insert("method".to_string(), Value::String(delivery.method.clone()));
    if !delivery.headers.is_empty() {
        item.insert(
            "headers".to_string(),
            Value::Object(delivery.headers.clone()),
        );
    }
    item.insert("body".to_string(), delivery.body.clone());
    item
}

#[async_trait::async_trait]
impl Adapter for Webhook {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    async fn run(&self, ctx: &AdapterContext<'_>) -> Result<AdapterOutput, RunError> {
        let items: Vec<Item> = ctx
            .context
            .webhook_deliveries
            .iter()
            .filter(|d| d.path == ctx.path)
            .map(to_item)
            .collect();

        tracing::debug!(
            path = %ctx.path,
            queued = ctx.context.webhook_deliveries.len(),
            matched = items.len(),
            "webhook deliveries"
        );

        Ok(AdapterOutput {
            items,
            should_deduplicate: true,
            update_interval: None,
            item_key: None,
            soft_fail: None,
        })
    }
}
