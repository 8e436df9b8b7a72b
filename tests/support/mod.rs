//! Shared helpers for integration tests: socket guard, canned fetchers and
//! flaky HTTP responders.

#![allow(dead_code)]

pub mod socket_guard;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use page_loader_core::{FetchError, FetchResult, ResourceFetcher, ResponseKind};
use url::Url;
use wiremock::{Respond, ResponseTemplate};

/// In-memory fetcher keyed by absolute URL.
///
/// Unknown URLs fail with `fallback_status`; every call is recorded.
pub struct StaticFetcher {
    routes: HashMap<String, Vec<u8>>,
    fallback_status: u16,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback_status: 404,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), body.into());
        self
    }

    pub fn fallback_status(mut self, status: u16) -> Self {
        self.fallback_status = status;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url, _kind: ResponseKind) -> Result<FetchResult, FetchError> {
        self.calls.lock().expect("calls lock").push(url.to_string());
        match self.routes.get(url.as_str()) {
            Some(body) => Ok(FetchResult {
                bytes: body.clone(),
                status: 200,
                content_type: String::new(),
            }),
            None => Err(FetchError::http_status(url.as_str(), self.fallback_status)),
        }
    }
}

/// Responder that fails the first `fail_count` requests with `fail_status`,
/// then returns 200 with `success_body`.
pub struct FlakyResponder {
    pub request_count: Arc<AtomicUsize>,
    pub fail_count: usize,
    pub fail_status: u16,
    pub success_body: Vec<u8>,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_count {
            ResponseTemplate::new(self.fail_status)
        } else {
            ResponseTemplate::new(200).set_body_bytes(self.success_body.clone())
        }
    }
}
