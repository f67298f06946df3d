//! Event types a delivery target can subscribe to

use crate::WebhookError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of capture events that trigger webhook deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A tweet was liked
    Like,

    /// A tweet was bookmarked
    Bookmark,

    /// A tweet was viewed
    View,
}

impl EventType {
    /// Every event type, in declaration order
    pub const ALL: [EventType; 3] = [EventType::Like, EventType::Bookmark, EventType::View];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Bookmark => "bookmark",
            Self::View => "view",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "bookmark" => Ok(Self::Bookmark),
            "view" => Ok(Self::View),
            other => Err(WebhookError::UnknownEvent(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("like".parse::<EventType>().unwrap(), EventType::Like);
        assert_eq!("Bookmark".parse::<EventType>().unwrap(), EventType::Bookmark);
        assert_eq!(" view ".parse::<EventType>().unwrap(), EventType::View);
        assert!("retweet".parse::<EventType>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&EventType::Bookmark).unwrap();
        assert_eq!(json, "\"bookmark\"");

        let parsed: EventType = serde_json::from_str("\"view\"").unwrap();
        assert_eq!(parsed, EventType::View);
    }

    #[test]
    fn test_display_matches_wire_name() {
        for event in EventType::ALL {
            assert_eq!(event.to_string(), event.as_str());
        }
    }
}
