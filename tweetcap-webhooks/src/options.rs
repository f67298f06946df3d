//! Options for the delivery pipeline

use crate::BackoffPolicy;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Timeout used by connectivity tests
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Options shared by the sender and the retry queue
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Timeout for delivery requests that do not override it
    pub request_timeout: Duration,

    /// Timeout for `Sender::test`
    pub test_timeout: Duration,

    /// User-Agent header for outgoing requests
    pub user_agent: String,

    /// Retry backoff
    pub backoff: BackoffPolicy,

    /// Response bodies are kept up to this many characters
    pub max_response_chars: usize,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            test_timeout: DEFAULT_TEST_TIMEOUT,
            user_agent: format!("tweetcap-webhooks/{}", env!("CARGO_PKG_VERSION")),
            backoff: BackoffPolicy::default(),
            max_response_chars: 1024,
        }
    }
}

impl DeliveryOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom options
    pub fn builder() -> DeliveryOptionsBuilder {
        DeliveryOptionsBuilder::new()
    }
}

/// Builder for DeliveryOptions
#[derive(Debug, Clone, Default)]
pub struct DeliveryOptionsBuilder {
    options: DeliveryOptions,
}

impl DeliveryOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: DeliveryOptions::default(),
        }
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Set the connectivity test timeout
    pub fn test_timeout(mut self, timeout: Duration) -> Self {
        self.options.test_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    /// Set the retry backoff
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.options.backoff = backoff;
        self
    }

    /// Set the response text limit
    pub fn max_response_chars(mut self, chars: usize) -> Self {
        self.options.max_response_chars = chars;
        self
    }

    pub fn build(self) -> DeliveryOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DeliveryOptions::default();
        assert_eq!(options.request_timeout, Duration::from_millis(10_000));
        assert_eq!(options.test_timeout, Duration::from_millis(5_000));
        assert_eq!(options.backoff, BackoffPolicy::default());
        assert!(options.user_agent.starts_with("tweetcap-webhooks/"));
    }

    #[test]
    fn test_builder() {
        let options = DeliveryOptions::builder()
            .request_timeout(Duration::from_secs(3))
            .test_timeout(Duration::from_secs(1))
            .user_agent("custom/1.0")
            .max_response_chars(64)
            .build();

        assert_eq!(options.request_timeout, Duration::from_secs(3));
        assert_eq!(options.test_timeout, Duration::from_secs(1));
        assert_eq!(options.user_agent, "custom/1.0");
        assert_eq!(options.max_response_chars, 64);
    }
}
