//! Error types for webhook operations

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the operator-facing parts of the pipeline.
///
/// Delivery itself never fails with one of these: transport problems end up
/// in a [`DeliveryResult`](crate::DeliveryResult) and, eventually, in a
/// `failed` delivery log row.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// URL parsed but uses a scheme we cannot deliver to
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Event name outside the closed set
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    /// Payload serialization/deserialization failed
    #[error("Payload error: {0}")]
    PayloadError(String),

    /// Webhook configuration not found
    #[error("Webhook config not found: {0}")]
    ConfigNotFound(String),

    /// Webhook configuration rejected by validation
    #[error("Invalid webhook config: {0}")]
    InvalidConfig(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebhookError::ConfigNotFound("cfg-1".to_string());
        assert_eq!(err.to_string(), "Webhook config not found: cfg-1");

        let err = WebhookError::UnknownEvent("retweet".to_string());
        assert!(err.to_string().contains("retweet"));
    }

    #[test]
    fn test_from_store_error() {
        let err: WebhookError = StoreError::Unavailable("disk full".to_string()).into();
        assert!(matches!(err, WebhookError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_url_error() {
        let err: WebhookError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, WebhookError::InvalidUrl(_)));
    }
}
