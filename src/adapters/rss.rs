// src/adapters/rss.rs
//
// RSS 2.0 feed trigger. Each feed entry becomes one item; the default dedup
// key extraction downstream favors the entry's guid.

use serde::Deserialize;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::adapters::{Adapter, AdapterContext, FetchError, HttpRequest};
use crate::types::{AdapterOutput, Item, RunError};

pub struct Rss;

#[derive(Debug, Deserialize)]
struct Feed {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// <guid isPermaLink="..."> carries its value as text content.
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub(crate) fn parse_feed(xml: &str) -> anyhow::Result<Vec<Item>> {
    let feed: Feed = quick_xml::de::from_str(xml)?;
    let mut out = Vec::with_capacity(feed.channel.items.len());
    for entry in feed.channel.items {
        let mut item = Map::new();
        if let Some(title) = entry.title {
            item.insert("title".to_string(), Value::String(title));
        }
        if let Some(link) = entry.link {
            item.insert("link".to_string(), Value::String(link));
        }
        if let Some(guid) = entry.guid.and_then(|g| g.value) {
            item.insert("guid".to_string(), Value::String(guid));
        }
        if let Some(ts) = entry.pub_date.as_deref() {
            item.insert(
                "published_at".to_string(),
                Value::from(parse_rfc2822_to_unix(ts)),
            );
        }
        if let Some(description) = entry.description {
            item.insert("description".to_string(), Value::String(description));
        }
        out.push(item);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl Adapter for Rss {
    fn kind(&self) -> &'static str {
        "rss"
    }

    async fn run(&self, ctx: &AdapterContext<'_>) -> Result<AdapterOutput, RunError> {
        let url = ctx.required_str_option("url")?.to_string();
        let update_interval = ctx.u64_option("every");

        let resp = match ctx.http.fetch(&HttpRequest::get(&url)).await {
            Ok(resp) => resp,
            Err(FetchError::Connect { url }) => return Err(RunError::Unreachable { url }),
            Err(FetchError::Other(e)) => {
                tracing::warn!(error = ?e, url = %url, "rss fetch failed");
                let mut out = AdapterOutput::empty();
                out.soft_fail = Some(format!("rss fetch failed for {url}: {e:#}"));
                return Ok(out);
            }
        };
        if resp.status >= 400 {
            tracing::warn!(status = resp.status, url = %url, "rss returned error status");
            let mut out = AdapterOutput::empty();
            out.soft_fail = Some(format!("rss returned status {} for {url}", resp.status));
            return Ok(out);
        }

        let items = match parse_feed(&resp.body) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, url = %url, "rss parse failed");
                let mut out = AdapterOutput::empty();
                out.soft_fail = Some(format!("rss parse failed for {url}: {e:#}"));
                return Ok(out);
            }
        };

        Ok(AdapterOutput {
            items,
            should_deduplicate: true,
            update_interval,
            item_key: None,
            soft_fail: None,
        })
    }
}
