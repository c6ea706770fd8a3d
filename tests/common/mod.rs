// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use flowpoll::adapters::{FetchError, HttpFetch, HttpRequest, HttpResponse};
use flowpoll::{MemoryCache, TriggerRunner, TriggerSpec};

/// Canned-response HTTP collaborator. Responses are consumed in order; a
/// fetch with nothing queued is a test bug.
pub struct MockHttp {
    responses: Mutex<VecDeque<Result<HttpResponse, FetchError>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_json(&self, value: &Value) {
        self.push_body(&value.to_string());
    }

    pub fn push_body(&self, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        }));
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_connect_refused(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Connect {
                url: url.to_string(),
            }));
    }

    pub fn push_request_error(&self, msg: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Other(anyhow::anyhow!(msg.to_string()))));
    }
}

#[async_trait::async_trait]
impl HttpFetch for MockHttp {
    async fn fetch(&self, req: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(req.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockHttp: no canned response left")
    }
}

pub fn spec(kind: &str, path: &str, options: Value) -> TriggerSpec {
    TriggerSpec {
        kind: kind.to_string(),
        options: options.as_object().cloned().unwrap_or_default(),
        path: path.to_string(),
    }
}

pub fn runner(cache: Arc<MemoryCache>, http: Arc<MockHttp>) -> TriggerRunner {
    TriggerRunner::new(cache, http)
}
