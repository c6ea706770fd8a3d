// src/adapters/telegram_bot.rs
//
// Telegram bot trigger. Polls the Bot API getUpdates endpoint and emits one
// item per update message, optionally filtered by an allowlist of message
// kinds. Keys items by the provider's update_id so edits to the same update
// never re-fire.

use serde_json::{Map, Value};

use crate::adapters::{parse_json_body, Adapter, AdapterContext, FetchError, HttpRequest};
use crate::digest::content_digest;
use crate::types::{AdapterOutput, Item, ItemKeyFn, RunError};

pub struct TelegramBot;

/// Message kinds understood by the allowlist, per the Bot API message object.
pub const MESSAGE_KINDS: &[&str] = &[
    "text",
    "animation",
    "audio",
    "channel_chat_created",
    "contact",
    "delete_chat_photo",
    "dice",
    "document",
    "game",
    "group_chat_created",
    "invoice",
    "left_chat_member",
    "location",
    "migrate_from_chat_id",
    "migrate_to_chat_id",
    "new_chat_members",
    "new_chat_photo",
    "new_chat_title",
    "passport_data",
    "photo",
    "pinned_message",
    "poll",
    "sticker",
    "successful_payment",
    "supergroup_chat_created",
    "video",
    "video_note",
    "voice",
];

const DEFAULT_EVERY_MINUTES: u64 = 5;

// Options consumed by the adapter or the pipeline itself; everything else is
// forwarded to the getUpdates call.
const RESERVED_OPTIONS: &[&str] = &[
    "token",
    "every",
    "event",
    "events",
    "id",
    "skip_first",
    "max_items_count",
];

fn allowlist(options: &Map<String, Value>) -> Option<Vec<String>> {
    if let Some(events) = options.get("events").and_then(Value::as_array) {
        return Some(
            events
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        );
    }
    options
        .get("event")
        .and_then(Value::as_str)
        .map(|e| vec![e.to_string()])
}

fn passthrough_query(options: &Map<String, Value>) -> Vec<(String, String)> {
    options
        .iter()
        .filter(|(k, _)| !RESERVED_OPTIONS.contains(&k.as_str()))
        .filter_map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => v.to_string(),
                _ => return None,
            };
            Some((k.clone(), rendered))
        })
        .collect()
}

fn message_kind(message: &Item) -> Option<&'static str> {
    MESSAGE_KINDS
        .iter()
        .find(|kind| message.contains_key(**kind))
        .copied()
}

pub(crate) fn collect_updates(body: &Value, events: Option<&[String]>) -> Vec<Item> {
    let updates = match body.get("result").and_then(Value::as_array) {
        Some(updates) => updates,
        None => return Vec::new(),
    };

    let mut items = Vec::new();
    for update in updates {
        let mut message = match update.get("message").and_then(Value::as_object) {
            Some(m) => m.clone(),
            None => continue,
        };
        if let Some(update_id) = update.get("update_id") {
            // The update identifier lives on the envelope; fold it into the
            // message so the dedup key survives.
            message.insert("update_id".to_string(), update_id.clone());
        }
        match events {
            Some(allow) => {
                if let Some(kind) = message_kind(&message) {
                    if allow.iter().any(|e| e == kind) {
                        items.push(message);
                    }
                }
            }
            None => items.push(message),
        }
    }
    items
}

fn update_id_key() -> ItemKeyFn {
    Box::new(|item: &Item| match item.get("update_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => content_digest(&Value::Object(item.clone())),
    })
}

#[async_trait::async_trait]
impl Adapter for TelegramBot {
    fn kind(&self) -> &'static str {
        "telegram_bot"
    }

    async fn run(&self, ctx: &AdapterContext<'_>) -> Result<AdapterOutput, RunError> {
        let token = ctx.required_str_option("token")?;
        let update_interval = ctx.u64_option("every").unwrap_or(DEFAULT_EVERY_MINUTES);
        let events = allowlist(ctx.options);

        let url = format!("https://api.telegram.org/bot{token}/getUpdates");
        let req = HttpRequest {
            url: url.clone(),
            query: passthrough_query(ctx.options),
        };

        let mut out = AdapterOutput {
            items: Vec::new(),
            should_deduplicate: true,
            update_interval: Some(update_interval),
            item_key: Some(update_id_key()),
            soft_fail: None,
        };

        let resp = match ctx.http.fetch(&req).await {
            Ok(resp) => resp,
            Err(FetchError::Connect { url }) => return Err(RunError::Unreachable { url }),
            Err(FetchError::Other(e)) => {
                tracing::warn!(error = ?e, url = %url, "telegram getUpdates failed");
                out.soft_fail = Some(format!("telegram getUpdates failed: {e:#}"));
                return Ok(out);
            }
        };
        if resp.status >= 400 {
            tracing::warn!(status = resp.status, url = %url, "telegram returned error status");
            out.soft_fail = Some(format!("telegram returned status {}", resp.status));
            return Ok(out);
        }

        match parse_json_body(&resp.body) {
            Ok(body) => out.items = collect_updates(&body, events.as_deref()),
            Err(e) => {
                tracing::warn!(error = ?e, url = %url, "telegram response was not valid JSON");
                out.soft_fail = Some(format!("telegram parse failed: {e:#}"));
            }
        }
        Ok(out)
    }
}
