// src/adapters/mod.rs
pub mod poll;
pub mod rss;
pub mod telegram_bot;
pub mod webhook;

use std::sync::Arc;

use anyhow::Context as _;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::cache::ScopedCache;
use crate::types::{AdapterOutput, RunContext, RunError};

/// Pluggable source-fetch capability for one trigger kind.
///
/// Implementations must be stateless across invocations; any cross-run memory
/// goes through the provided cache handle. Missing required configuration is
/// a fatal error, ordinary "no new data" is an empty item list.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> &'static str;
    async fn run(&self, ctx: &AdapterContext<'_>) -> Result<AdapterOutput, RunError>;
}

/// Everything an adapter invocation gets: its options, a cache scoped to the
/// trigger's namespace, the HTTP collaborator, and the opaque execution
/// context passed through from the caller.
pub struct AdapterContext<'a> {
    pub options: &'a Map<String, Value>,
    /// Workflow-relative path of the declaring trigger, for adapters that
    /// route by it (webhook).
    pub path: &'a str,
    pub cache: ScopedCache,
    pub http: Arc<dyn HttpFetch>,
    pub context: &'a RunContext,
}

impl AdapterContext<'_> {
    pub fn required_str_option(&self, name: &str) -> Result<&str, RunError> {
        self.options
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RunError::MissingConfig {
                name: name.to_string(),
            })
    }

    pub fn u64_option(&self, name: &str) -> Option<u64> {
        self.options.get(name).and_then(Value::as_u64)
    }

    pub fn bool_option(&self, name: &str) -> Option<bool> {
        self.options.get(name).and_then(Value::as_bool)
    }
}

/// Plain GET request; `query` parameters are appended to the URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP fetch errors, split so adapters can classify connection failures as
/// fatal while soft-failing everything else.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection failed for {url}")]
    Connect { url: String },
    #[error("request failed: {0}")]
    Other(anyhow::Error),
}

/// HTTP fetch capability used by adapters; a trait so tests can substitute
/// canned responses for the network.
#[async_trait::async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let resp = self
            .client
            .get(&req.url)
            .query(&req.query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    FetchError::Connect {
                        url: req.url.clone(),
                    }
                } else {
                    FetchError::Other(anyhow::Error::new(e).context("sending request"))
                }
            })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Other(anyhow::Error::new(e).context("reading body")))?;
        Ok(HttpResponse { status, body })
    }
}

pub(crate) fn parse_json_body(body: &str) -> anyhow::Result<Value> {
    serde_json::from_str(body.trim()).context("parsing response body as JSON")
}
