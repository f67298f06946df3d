//! Captured tweet entity, as handed over by the event source
//!
//! Every field is optional: the capture layer may only know a tweet's id
//! (for example when a like is intercepted before the timeline is loaded).

use serde::{Deserialize, Serialize};

/// A captured tweet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tweet {
    pub id: String,
    pub text: Option<String>,
    pub user: Option<TweetUser>,
    pub created_at: Option<String>,
    pub favorite_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub quote_count: Option<u64>,
    pub bookmark_count: Option<u64>,
    pub media: Vec<TweetMedia>,
    pub urls: Vec<TweetUrl>,
    pub retweeted_status: Option<Box<Tweet>>,
    pub quoted_status: Option<Box<Tweet>>,
    pub article: Option<TweetArticle>,
}

impl Tweet {
    /// Minimal entity carrying only an identifier
    pub fn stub(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the tweet text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the author
    pub fn with_user(mut self, user: TweetUser) -> Self {
        self.user = Some(user);
        self
    }
}

/// Tweet author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetUser {
    pub id: String,
    pub screen_name: String,
    pub name: String,
}

impl TweetUser {
    pub fn new(
        id: impl Into<String>,
        screen_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            screen_name: screen_name.into(),
            name: name.into(),
        }
    }
}

/// Attached photo, video or GIF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetMedia {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub video_url: Option<String>,
}

/// Link entity found in the tweet text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetUrl {
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
}

/// Long-form article attached to the tweet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetArticle {
    pub id: String,
    pub title: String,
    pub preview_text: String,
}
