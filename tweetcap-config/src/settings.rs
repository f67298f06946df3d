// Typed settings and their validation

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Output formats accepted by `logging.format`
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level tweetcap settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub delivery: DeliverySettings,
    pub logging: LogSettings,
}

/// Webhook delivery tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub request_timeout_ms: u64,
    pub test_timeout_ms: u64,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub user_agent: String,
    /// Response bodies are kept up to this many characters
    pub max_response_chars: usize,
    /// Start the retry queue when the application is built
    pub start_retry_queue: bool,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            test_timeout_ms: 5_000,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 300_000,
            user_agent: format!("tweetcap/{}", env!("CARGO_PKG_VERSION")),
            max_response_chars: 1024,
            start_retry_queue: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// One of [`LOG_LEVELS`]
    pub level: String,
    /// One of [`LOG_FORMATS`]
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let delivery = &self.delivery;
        positive("delivery.request_timeout_ms", delivery.request_timeout_ms)?;
        positive("delivery.test_timeout_ms", delivery.test_timeout_ms)?;
        positive("delivery.retry_base_delay_ms", delivery.retry_base_delay_ms)?;

        if delivery.retry_base_delay_ms > delivery.retry_max_delay_ms {
            return Err(ConfigError::Validation(format!(
                "delivery.retry_base_delay_ms ({}) exceeds delivery.retry_max_delay_ms ({})",
                delivery.retry_base_delay_ms, delivery.retry_max_delay_ms
            )));
        }

        if delivery.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "delivery.user_agent cannot be empty".to_string(),
            ));
        }

        one_of("logging.level", &self.logging.level, &LOG_LEVELS)?;
        one_of("logging.format", &self.logging.format, &LOG_FORMATS)?;
        Ok(())
    }

    /// Apply one flat override such as `request_timeout_ms` or `log_level`.
    ///
    /// Returns `false` for keys that do not name a setting.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<bool> {
        let delivery = &mut self.delivery;
        match key {
            "request_timeout_ms" => delivery.request_timeout_ms = parse(key, value)?,
            "test_timeout_ms" => delivery.test_timeout_ms = parse(key, value)?,
            "retry_base_delay_ms" => delivery.retry_base_delay_ms = parse(key, value)?,
            "retry_max_delay_ms" => delivery.retry_max_delay_ms = parse(key, value)?,
            "max_response_chars" => delivery.max_response_chars = parse(key, value)?,
            "start_retry_queue" => delivery.start_retry_queue = parse_bool(key, value)?,
            "user_agent" => delivery.user_agent = value.to_string(),
            "log_level" => self.logging.level = value.trim().to_lowercase(),
            "log_format" => self.logging.format = value.trim().to_lowercase(),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::Validation(format!("{} must be positive", field)));
    }
    Ok(())
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be one of {}, got {:?}",
            field,
            allowed.join(", "),
            value
        )));
    }
    Ok(())
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidOverride {
            key: key.to_string(),
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.delivery.request_timeout_ms, 10_000);
        assert_eq!(settings.delivery.test_timeout_ms, 5_000);
        assert_eq!(settings.delivery.retry_base_delay_ms, 1_000);
        assert_eq!(settings.delivery.retry_max_delay_ms, 300_000);
        assert!(settings.delivery.user_agent.starts_with("tweetcap/"));
        assert!(settings.delivery.start_retry_queue);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "pretty");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"delivery": {"test_timeout_ms": 750}}"#).unwrap();

        assert_eq!(settings.delivery.test_timeout_ms, 750);
        assert_eq!(settings.delivery.request_timeout_ms, 10_000);
        assert_eq!(settings.logging, LogSettings::default());
    }

    #[test]
    fn test_validation_failures() {
        let mut settings = Settings::default();
        settings.delivery.request_timeout_ms = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));

        let mut settings = Settings::default();
        settings.delivery.retry_base_delay_ms = 10_000;
        settings.delivery.retry_max_delay_ms = 5_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_apply_override() {
        let mut settings = Settings::default();

        assert!(settings.apply_override("request_timeout_ms", " 2500 ").unwrap());
        assert!(settings.apply_override("start_retry_queue", "off").unwrap());
        assert!(settings.apply_override("log_level", "DEBUG").unwrap());
        assert!(!settings.apply_override("unrelated", "x").unwrap());

        assert_eq!(settings.delivery.request_timeout_ms, 2500);
        assert!(!settings.delivery.start_retry_queue);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_bad_override_value() {
        let mut settings = Settings::default();

        let err = settings.apply_override("test_timeout_ms", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { ref key, .. } if key == "test_timeout_ms"));

        assert!(settings.apply_override("start_retry_queue", "maybe").is_err());
    }
}
