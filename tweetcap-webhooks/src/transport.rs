//! HTTP transport boundary

use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// A single outgoing HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Create a POST request with an empty header map
    pub fn post(url: impl Into<String>, body: Vec<u8>, timeout: Duration) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HashMap::new(),
            body,
            timeout,
        }
    }
}

/// How a request ended; exactly one per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// A response arrived, whatever its status
    Load {
        status: u16,
        status_text: String,
        response_text: String,
    },

    /// The request never produced a response
    Error { status_text: String },

    /// The request exceeded its timeout
    Timeout,
}

impl TransportOutcome {
    /// Response with an empty body
    pub fn load(status: u16, status_text: impl Into<String>) -> Self {
        Self::Load {
            status,
            status_text: status_text.into(),
            response_text: String::new(),
        }
    }

    /// Network-level failure
    pub fn error(status_text: impl Into<String>) -> Self {
        Self::Error {
            status_text: status_text.into(),
        }
    }
}

/// Asynchronous HTTP client used by the sender
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request. Never fails: every problem is an outcome.
    async fn request(&self, request: HttpRequest) -> TransportOutcome;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport sending the given User-Agent
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: HttpRequest) -> TransportOutcome {
        debug!(method = %request.method, url = %request.url, "Sending HTTP request");

        let headers = match header_map(&request.headers) {
            Ok(headers) => headers,
            Err(status_text) => return TransportOutcome::Error { status_text },
        };

        let builder = self
            .client
            .request(request.method, &request.url)
            .timeout(request.timeout)
            .headers(headers);

        let response = match builder.body(request.body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return TransportOutcome::Timeout,
            Err(e) => {
                return TransportOutcome::Error {
                    status_text: e.to_string(),
                };
            }
        };

        let status = response.status();
        let response_text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return TransportOutcome::Timeout,
            Err(_) => String::new(),
        };

        TransportOutcome::Load {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_text,
        }
    }
}

/// Build a header map where each name carries exactly one value
fn header_map(headers: &HashMap<String, String>) -> std::result::Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| format!("invalid header name {key:?}: {e}"))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid value for header {key}: {e}"))?;
        map.insert(name, value);
    }
    Ok(map)
}
