//! Sender for single webhook delivery attempts

use crate::{
    DeliveryOptions, EventType, HttpRequest, Transport, TransportOutcome, Tweet, TweetUser,
    WebhookPayload, format_payload,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    /// A 2xx response
    pub fn delivered(status: u16, response_text: Option<String>) -> Self {
        Self {
            success: true,
            status: Some(status),
            response_text,
            error: None,
        }
    }

    /// A failed attempt, optionally with the response that caused it
    pub fn failed(error: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            success: false,
            status,
            response_text: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Error text, or a generic message for failures that carry none
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Unknown delivery error".to_string())
    }
}

/// Per-call delivery target
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Falls back to [`DeliveryOptions::request_timeout`]
    pub timeout: Option<Duration>,
}

impl SendOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Stateless sender: one POST per call, every outcome folded into a [`DeliveryResult`]
#[derive(Clone)]
pub struct Sender {
    transport: Arc<dyn Transport>,
    options: DeliveryOptions,
}

impl Sender {
    /// Create a sender over the given transport
    pub fn new(transport: Arc<dyn Transport>, options: DeliveryOptions) -> Self {
        Self { transport, options }
    }

    /// Get the options
    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }

    /// Deliver a payload once. Never fails.
    pub async fn send(&self, payload: &WebhookPayload, send: SendOptions) -> DeliveryResult {
        let body = match payload.to_bytes() {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %send.url, error = %e, "Failed to serialize webhook payload");
                return DeliveryResult::failed(format!("Failed to serialize payload: {}", e), None);
            }
        };

        let timeout = send.timeout.unwrap_or(self.options.request_timeout);
        let mut request = HttpRequest::post(&send.url, body, timeout);
        set_header(&mut request.headers, "Content-Type", "application/json".to_string());
        set_header(&mut request.headers, "X-Webhook-Event", payload.event.to_string());
        for (key, value) in send.headers {
            set_header(&mut request.headers, key, value);
        }

        debug!(url = %send.url, event = %payload.event, "Webhook delivery attempt");

        let result = match self.transport.request(request).await {
            TransportOutcome::Load {
                status,
                status_text,
                response_text,
            } => {
                let response_text =
                    Some(truncate_chars(&response_text, self.options.max_response_chars));
                if Self::is_success_status(status) {
                    DeliveryResult::delivered(status, response_text)
                } else {
                    DeliveryResult {
                        success: false,
                        status: Some(status),
                        response_text,
                        error: Some(format!("HTTP {}: {}", status, status_text)),
                    }
                }
            }
            TransportOutcome::Error { status_text } if status_text.is_empty() => {
                DeliveryResult::failed("Network error", None)
            }
            TransportOutcome::Error { status_text } => {
                DeliveryResult::failed(format!("Network error: {}", status_text), None)
            }
            TransportOutcome::Timeout => DeliveryResult::failed(
                format!("Request timed out after {}ms", timeout.as_millis()),
                None,
            ),
        };

        if result.success {
            debug!(url = %send.url, status = ?result.status, "Webhook delivered");
        } else {
            warn!(
                url = %send.url,
                status = ?result.status,
                error = %result.error_message(),
                "Webhook delivery failed"
            );
        }
        result
    }

    /// Send a synthetic `like` payload to check that a target is reachable
    pub async fn test(&self, url: &str, headers: HashMap<String, String>) -> DeliveryResult {
        info!(url = %url, "Sending webhook connectivity test");
        let payload = format_payload(EventType::Like, &test_tweet());
        let send = SendOptions::new(url)
            .with_headers(headers)
            .with_timeout(self.options.test_timeout);
        self.send(&payload, send).await
    }

    /// Success is any status in [200, 300)
    fn is_success_status(status: u16) -> bool {
        (200..300).contains(&status)
    }
}

/// Tweet used by connectivity tests
fn test_tweet() -> Tweet {
    let mut tweet = Tweet::stub(format!("test-{}", Utc::now().timestamp_millis()))
        .with_text("This is a test webhook from tweetcap")
        .with_user(TweetUser::new("0", "tweetcap", "tweetcap test"));
    tweet.created_at = Some(Utc::now().to_rfc3339());
    tweet
}

/// Insert a header, replacing any existing one whose name differs only in case
fn set_header(headers: &mut HashMap<String, String>, name: impl Into<String>, value: String) {
    let name = name.into();
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

/// Truncate a string to at most `max_chars` characters
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
