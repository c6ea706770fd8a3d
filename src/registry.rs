// src/registry.rs
//
// Static mapping from trigger-kind name to its adapter. Adapters are
// stateless values, so one shared instance per kind is enough.

use crate::adapters::{poll::Poll, rss::Rss, telegram_bot::TelegramBot, webhook::Webhook, Adapter};

static POLL: Poll = Poll;
static RSS: Rss = Rss;
static WEBHOOK: Webhook = Webhook;
static TELEGRAM_BOT: TelegramBot = TelegramBot;

/// Resolve a trigger kind to its adapter. `None` for unknown kinds; the
/// runner treats that as a non-fatal warning so one typo never aborts a
/// whole batch.
pub fn resolve(kind: &str) -> Option<&'static dyn Adapter> {
    match kind {
        "poll" => Some(&POLL),
        "rss" => Some(&RSS),
        "webhook" => Some(&WEBHOOK),
        "telegram_bot" => Some(&TELEGRAM_BOT),
        _ => None,
    }
}

/// Supported trigger kinds, for configuration-validation time rejection.
pub fn known_kinds() -> &'static [&'static str] {
    &["poll", "rss", "webhook", "telegram_bot"]
}
