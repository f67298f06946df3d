//! Scripted transport for exercising the pipeline without a network

use crate::{HttpRequest, Transport, TransportOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<TransportOutcome>>,
    fixed: HashMap<String, TransportOutcome>,
    panics: HashSet<String>,
    requests: Vec<HttpRequest>,
}

/// Transport that replays scripted outcomes per URL and records every request.
///
/// Resolution order for a URL: queued outcomes (FIFO), then the URL's fixed
/// outcome, then the default (`200 OK` unless overridden).
#[derive(Debug, Clone)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    default: TransportOutcome,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Transport answering `200 OK` to everything
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            default: TransportOutcome::load(200, "OK"),
            delay: None,
        }
    }

    /// Set the outcome for URLs without a script
    pub fn with_default(mut self, outcome: TransportOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a one-shot outcome for a URL
    pub fn push(&self, url: impl Into<String>, outcome: TransportOutcome) {
        self.script
            .lock()
            .queued
            .entry(url.into())
            .or_default()
            .push_back(outcome);
    }

    /// Answer every request to a URL with the same outcome
    pub fn respond_always(&self, url: impl Into<String>, outcome: TransportOutcome) {
        self.script.lock().fixed.insert(url.into(), outcome);
    }

    /// Panic while handling requests to a URL
    pub fn panic_on(&self, url: impl Into<String>) {
        self.script.lock().panics.insert(url.into());
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().requests.clone()
    }

    /// Requests received for one URL
    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.script
            .lock()
            .requests
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: HttpRequest) -> TransportOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (outcome, should_panic) = {
            let mut script = self.script.lock();
            let url = request.url.clone();
            script.requests.push(request);

            let outcome = script
                .queued
                .get_mut(&url)
                .and_then(VecDeque::pop_front)
                .or_else(|| script.fixed.get(&url).cloned())
                .unwrap_or_else(|| self.default.clone());
            (outcome, script.panics.contains(&url))
        };

        if should_panic {
            panic!("mock transport configured to panic");
        }
        outcome
    }
}
