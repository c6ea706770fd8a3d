// src/adapters/poll.rs
//
// Generic scheduled HTTP poll. Fetches a JSON resource and maps it to items:
// an array yields one item per element, an object yields a single item.

use serde_json::{Map, Value};

use crate::adapters::{parse_json_body, Adapter, AdapterContext, FetchError, HttpRequest};
use crate::digest::content_digest;
use crate::types::{AdapterOutput, Item, ItemKeyFn, RunError};

pub struct Poll;

fn to_item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => {
            // Scalar/array elements still need a map shape downstream.
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[async_trait::async_trait]
impl Adapter for Poll {
    fn kind(&self) -> &'static str {
        "poll"
    }

    async fn run(&self, ctx: &AdapterContext<'_>) -> Result<AdapterOutput, RunError> {
        let url = ctx.required_str_option("url")?.to_string();
        let should_deduplicate = ctx.bool_option("should_deduplicate").unwrap_or(true);
        let update_interval = ctx.u64_option("every");
        let dedup_field = ctx
            .options
            .get("deduplication_key")
            .and_then(Value::as_str)
            .map(str::to_string);

        let req = HttpRequest::get(&url);
        let resp = match ctx.http.fetch(&req).await {
            Ok(resp) => resp,
            Err(FetchError::Connect { url }) => return Err(RunError::Unreachable { url }),
            Err(FetchError::Other(e)) => {
                tracing::warn!(error = ?e, url = %url, "poll fetch failed");
                let mut out = AdapterOutput::empty();
                out.soft_fail = Some(format!("poll fetch failed for {url}: {e:#}"));
                return Ok(out);
            }
        };
        if resp.status >= 400 {
            tracing::warn!(status = resp.status, url = %url, "poll returned error status");
            let mut out = AdapterOutput::empty();
            out.soft_fail = Some(format!("poll returned status {} for {url}", resp.status));
            return Ok(out);
        }

        let items = match parse_json_body(&resp.body) {
            Ok(Value::Array(values)) => values.into_iter().map(to_item).collect(),
            Ok(Value::Null) => Vec::new(),
            Ok(other) => vec![to_item(other)],
            Err(e) => {
                tracing::warn!(error = ?e, url = %url, "poll body was not valid JSON");
                let mut out = AdapterOutput::empty();
                out.soft_fail = Some(format!("poll parse failed for {url}: {e:#}"));
                return Ok(out);
            }
        };

        let item_key = dedup_field.map(|field| -> ItemKeyFn {
            Box::new(move |item: &Item| match item.get(&field) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => content_digest(&Value::Object(item.clone())),
            })
        });

        Ok(AdapterOutput {
            items,
            should_deduplicate,
            update_interval,
            item_key,
            soft_fail: None,
        })
    }
}
