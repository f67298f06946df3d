//! Delivery log records

use crate::EventType;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a delivery attempt series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// First attempt in flight, or retries still owed
    Pending,

    /// Delivered
    Success,

    /// Gave up
    Failed,
}

impl DeliveryStatus {
    /// Check if the delivery is complete (success or failure)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record for one (event, target) delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLog {
    /// `webhook-{event}-{entity_id}-{timestamp}`
    pub id: String,

    /// Webhook config this delivery targets
    pub config_id: String,

    pub event_type: EventType,

    /// Id of the tweet the event is about
    pub entity_id: String,

    /// Destination URL at the time of delivery
    pub url: String,

    pub status: DeliveryStatus,

    /// Serialized request body
    pub payload: String,

    /// HTTP status from the last attempt that produced a response
    pub response_status: Option<u16>,

    /// Error message from the last failed attempt
    pub error_message: Option<String>,

    /// Created timestamp (epoch ms)
    pub created_at: i64,

    /// Number of retries performed so far
    pub retry_count: u32,
}

impl DeliveryLog {
    /// Create a pending log row
    pub fn pending(
        id: impl Into<String>,
        config_id: impl Into<String>,
        event_type: EventType,
        entity_id: impl Into<String>,
        url: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            config_id: config_id.into(),
            event_type,
            entity_id: entity_id.into(),
            url: url.into(),
            status: DeliveryStatus::Pending,
            payload: payload.into(),
            response_status: None,
            error_message: None,
            created_at: Utc::now().timestamp_millis(),
            retry_count: 0,
        }
    }

    /// Apply a partial update in place.
    ///
    /// `retry_count` never decreases.
    pub fn apply(&mut self, update: &LogUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(code) = update.response_status {
            self.response_status = Some(code);
        }
        if let Some(error) = &update.error_message {
            self.error_message = Some(error.clone());
        }
        if let Some(count) = update.retry_count {
            self.retry_count = self.retry_count.max(count);
        }
    }
}

/// Partial fields for a delivery log update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogUpdate {
    pub status: Option<DeliveryStatus>,
    pub response_status: Option<u16>,
    pub error_message: Option<String>,
    pub retry_count: Option<u32>,
}

impl LogUpdate {
    /// Terminal success update
    pub fn success(response_status: Option<u16>, retry_count: u32) -> Self {
        Self {
            status: Some(DeliveryStatus::Success),
            response_status,
            error_message: None,
            retry_count: Some(retry_count),
        }
    }

    /// Terminal failure update
    pub fn failed(error: impl Into<String>, response_status: Option<u16>, retry_count: u32) -> Self {
        Self {
            status: Some(DeliveryStatus::Failed),
            response_status,
            error_message: Some(error.into()),
            retry_count: Some(retry_count),
        }
    }

    /// Non-terminal progress update after a failed retry
    pub fn progress(error: impl Into<String>, response_status: Option<u16>, retry_count: u32) -> Self {
        Self {
            status: None,
            response_status,
            error_message: Some(error.into()),
            retry_count: Some(retry_count),
        }
    }

    /// Whether applying this update would finalize the row
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }
}
