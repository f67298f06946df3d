//! Webhook delivery target configuration

use crate::{EventType, Result, WebhookError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use url::Url;
use uuid::Uuid;

/// An operator-defined delivery target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Unique config ID
    pub id: String,

    /// Display name
    pub name: String,

    /// Destination URL
    pub url: String,

    /// Whether deliveries are attempted for this target
    pub enabled: bool,

    /// Events this target is subscribed to
    pub events: BTreeSet<EventType>,

    /// Custom headers to include with requests
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Whether failed deliveries are handed to the retry queue
    pub retry_on_failure: bool,

    /// Maximum number of retries after the first failed attempt
    pub max_retries: u32,

    /// Created timestamp (epoch ms)
    pub created_at: i64,

    /// Updated timestamp (epoch ms)
    pub updated_at: i64,
}

impl WebhookConfig {
    /// Create a new enabled config with the given name and URL
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            enabled: true,
            events: BTreeSet::new(),
            headers: HashMap::new(),
            retry_on_failure: true,
            max_retries: 3,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a builder for custom configuration
    pub fn builder(name: impl Into<String>, url: impl Into<String>) -> WebhookConfigBuilder {
        WebhookConfigBuilder::new(name, url)
    }

    /// Check if this target should receive an event
    pub fn is_subscribed_to(&self, event: EventType) -> bool {
        self.events.contains(&event)
    }

    /// Whether a failed delivery to this target may be retried
    pub fn allows_retry(&self) -> bool {
        self.retry_on_failure && self.max_retries > 0
    }

    /// Reject configs the pipeline cannot deliver to
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WebhookError::InvalidConfig("name must not be empty".to_string()));
        }

        let url = Url::parse(&self.url)?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(WebhookError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&mut self, patch: WebhookConfigPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(events) = patch.events {
            self.events = events;
        }
        if let Some(headers) = patch.headers {
            self.headers = headers;
        }
        if let Some(retry) = patch.retry_on_failure {
            self.retry_on_failure = retry;
        }
        if let Some(max) = patch.max_retries {
            self.max_retries = max;
        }
        self.updated_at = Utc::now().timestamp_millis().max(self.updated_at);
    }
}

/// Partial update for a [`WebhookConfig`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfigPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
    pub events: Option<BTreeSet<EventType>>,
    pub headers: Option<HashMap<String, String>>,
    pub retry_on_failure: Option<bool>,
    pub max_retries: Option<u32>,
}

impl WebhookConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.events = Some(events.into_iter().collect());
        self
    }

    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }
}

/// Builder for WebhookConfig
#[derive(Debug, Clone)]
pub struct WebhookConfigBuilder {
    config: WebhookConfig,
}

impl WebhookConfigBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            config: WebhookConfig::new(name, url),
        }
    }

    /// Set a custom ID
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Subscribe to events
    pub fn events(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.config.events = events.into_iter().collect();
        self
    }

    /// Subscribe to every event type
    pub fn all_events(mut self) -> Self {
        self.config.events = EventType::ALL.into_iter().collect();
        self
    }

    /// Add a custom header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Set enabled status
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the retry policy for this target
    pub fn retry(mut self, retry_on_failure: bool, max_retries: u32) -> Self {
        self.config.retry_on_failure = retry_on_failure;
        self.config.max_retries = max_retries;
        self
    }

    /// Disable retries
    pub fn no_retries(self) -> Self {
        self.retry(false, 0)
    }

    /// Build the config
    pub fn build(self) -> WebhookConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = WebhookConfig::new("Zapier", "https://hooks.example.com/abc");

        assert!(!config.id.is_empty());
        assert!(config.enabled);
        assert!(config.events.is_empty());
        assert!(config.allows_retry());
        assert_eq!(config.created_at, config.updated_at);
    }

    #[test]
    fn test_builder() {
        let config = WebhookConfig::builder("n8n", "https://n8n.example.com/hook")
            .id("cfg-1")
            .events([EventType::Like, EventType::Bookmark])
            .header("Authorization", "Bearer token")
            .retry(true, 5)
            .build();

        assert_eq!(config.id, "cfg-1");
        assert!(config.is_subscribed_to(EventType::Like));
        assert!(config.is_subscribed_to(EventType::Bookmark));
        assert!(!config.is_subscribed_to(EventType::View));
        assert_eq!(
            config.headers.get("Authorization"),
            Some(&"Bearer token".to_string())
        );
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_allows_retry_requires_both_flags() {
        let config = WebhookConfig::builder("a", "https://a.example").retry(true, 0).build();
        assert!(!config.allows_retry());

        let config = WebhookConfig::builder("a", "https://a.example").retry(false, 3).build();
        assert!(!config.allows_retry());

        let config = WebhookConfig::builder("a", "https://a.example").no_retries().build();
        assert!(!config.allows_retry());
    }

    #[test]
    fn test_validate() {
        assert!(WebhookConfig::new("ok", "https://example.com/hook").validate().is_ok());
        assert!(WebhookConfig::new("ok", "http://localhost:8080").validate().is_ok());

        assert!(matches!(
            WebhookConfig::new("", "https://example.com").validate(),
            Err(WebhookError::InvalidConfig(_))
        ));
        assert!(matches!(
            WebhookConfig::new("bad", "not a url").validate(),
            Err(WebhookError::InvalidUrl(_))
        ));
        assert!(matches!(
            WebhookConfig::new("ftp", "ftp://example.com").validate(),
            Err(WebhookError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_apply_patch() {
        let mut config = WebhookConfig::builder("old", "https://old.example")
            .events([EventType::Like])
            .build();
        let created = config.created_at;

        config.apply(
            WebhookConfigPatch::new()
                .name("new")
                .enabled(false)
                .events([EventType::View])
                .max_retries(1),
        );

        assert_eq!(config.name, "new");
        assert_eq!(config.url, "https://old.example");
        assert!(!config.enabled);
        assert!(config.is_subscribed_to(EventType::View));
        assert!(!config.is_subscribed_to(EventType::Like));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.created_at, created);
        assert!(config.updated_at >= created);
    }
}
