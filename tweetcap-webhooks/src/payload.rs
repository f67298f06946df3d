//! Webhook payload types and the tweet formatter

use crate::{EventType, Tweet};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Author name used when the entity carries no user block
pub const UNKNOWN_SCREEN_NAME: &str = "unknown";

/// A webhook payload to be sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event type that triggered the delivery
    pub event: EventType,

    /// Milliseconds since the Unix epoch when the payload was built
    pub timestamp: i64,

    /// Formatted tweet
    pub data: TweetData,
}

impl WebhookPayload {
    /// Create a payload stamped with the current time
    pub fn new(event: EventType, data: TweetData) -> Self {
        Self {
            event,
            timestamp: Utc::now().timestamp_millis(),
            data,
        }
    }

    /// Set a custom timestamp
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Convert to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The `data` block of a payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetData {
    pub id: String,
    pub text: String,
    pub author: AuthorData,
    pub url: String,
    pub created_at: String,
    pub stats: StatsData,
    pub media: Vec<MediaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_tweet: Option<Box<TweetData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_tweet: Option<Box<TweetData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<UrlData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorData {
    pub id: String,
    pub screen_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsData {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub bookmarks: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlData {
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleData {
    pub id: String,
    pub title: String,
    pub preview_text: String,
}

/// Build the wire payload for an event on a tweet.
///
/// Never fails: absent fields fall back to empty strings, zero counters and
/// an empty media list.
pub fn format_payload(event: EventType, tweet: &Tweet) -> WebhookPayload {
    WebhookPayload::new(event, format_tweet(tweet))
}

/// Format a tweet, including one level of retweeted/quoted tweets.
pub fn format_tweet(tweet: &Tweet) -> TweetData {
    let mut data = format_flat(tweet);
    data.retweeted_tweet = tweet
        .retweeted_status
        .as_deref()
        .map(|t| Box::new(format_flat(t)));
    data.quoted_tweet = tweet
        .quoted_status
        .as_deref()
        .map(|t| Box::new(format_flat(t)));
    data
}

fn format_flat(tweet: &Tweet) -> TweetData {
    let author = match &tweet.user {
        Some(user) => AuthorData {
            id: user.id.clone(),
            screen_name: if user.screen_name.is_empty() {
                UNKNOWN_SCREEN_NAME.to_string()
            } else {
                user.screen_name.clone()
            },
            name: user.name.clone(),
        },
        None => AuthorData {
            screen_name: UNKNOWN_SCREEN_NAME.to_string(),
            ..Default::default()
        },
    };

    let urls: Vec<UrlData> = tweet
        .urls
        .iter()
        .map(|u| UrlData {
            url: u.url.clone(),
            expanded_url: u.expanded_url.clone(),
            display_url: u.display_url.clone(),
        })
        .collect();

    TweetData {
        id: tweet.id.clone(),
        text: tweet.text.clone().unwrap_or_default(),
        url: tweet_url(&tweet.id, &author.screen_name),
        author,
        created_at: tweet.created_at.clone().unwrap_or_default(),
        stats: StatsData {
            likes: tweet.favorite_count.unwrap_or(0),
            retweets: tweet.retweet_count.unwrap_or(0),
            replies: tweet.reply_count.unwrap_or(0),
            quotes: tweet.quote_count.unwrap_or(0),
            bookmarks: tweet.bookmark_count.unwrap_or(0),
        },
        media: tweet
            .media
            .iter()
            .map(|m| MediaData {
                media_type: m.media_type.clone(),
                url: m.video_url.clone().unwrap_or_else(|| m.url.clone()),
            })
            .collect(),
        retweeted_tweet: None,
        quoted_tweet: None,
        urls: (!urls.is_empty()).then_some(urls),
        article: tweet.article.as_ref().map(|a| ArticleData {
            id: a.id.clone(),
            title: a.title.clone(),
            preview_text: a.preview_text.clone(),
        }),
    }
}

/// Permalink for a tweet; falls back to the id-only form when the author is unknown
pub fn tweet_url(id: &str, screen_name: &str) -> String {
    if screen_name.is_empty() || screen_name == UNKNOWN_SCREEN_NAME {
        format!("https://x.com/i/status/{}", id)
    } else {
        format!("https://x.com/{}/status/{}", screen_name, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TweetArticle, TweetMedia, TweetUrl, TweetUser};

    fn full_tweet() -> Tweet {
        Tweet {
            id: "100".to_string(),
            text: Some("hello world".to_string()),
            user: Some(TweetUser::new("42", "rustlang", "Rust Language")),
            created_at: Some("Wed Oct 10 20:19:24 +0000 2018".to_string()),
            favorite_count: Some(10),
            retweet_count: Some(2),
            reply_count: Some(1),
            quote_count: Some(3),
            bookmark_count: Some(4),
            media: vec![
                TweetMedia {
                    media_type: "photo".to_string(),
                    url: "https://pbs.example/p.jpg".to_string(),
                    video_url: None,
                },
                TweetMedia {
                    media_type: "video".to_string(),
                    url: "https://pbs.example/thumb.jpg".to_string(),
                    video_url: Some("https://video.example/v.mp4".to_string()),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_entity() {
        let payload = format_payload(EventType::Like, &Tweet::stub("123"));

        assert_eq!(payload.event, EventType::Like);
        assert_eq!(payload.data.id, "123");
        assert_eq!(payload.data.text, "");
        assert_eq!(payload.data.author.screen_name, "unknown");
        assert!(payload.data.media.is_empty());
        assert_eq!(payload.data.url, "https://x.com/i/status/123");
        assert_eq!(payload.data.stats, StatsData::default());
    }

    #[test]
    fn test_minimal_entity_omits_optional_blocks() {
        let payload = format_payload(EventType::View, &Tweet::stub("1"));
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();

        let data = json["data"].as_object().unwrap();
        assert!(!data.contains_key("retweeted_tweet"));
        assert!(!data.contains_key("quoted_tweet"));
        assert!(!data.contains_key("urls"));
        assert!(!data.contains_key("article"));
        assert_eq!(json["event"], "view");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_full_entity() {
        let data = format_tweet(&full_tweet());

        assert_eq!(data.text, "hello world");
        assert_eq!(data.author.id, "42");
        assert_eq!(data.author.name, "Rust Language");
        assert_eq!(data.url, "https://x.com/rustlang/status/100");
        assert_eq!(data.stats.likes, 10);
        assert_eq!(data.stats.bookmarks, 4);
        assert_eq!(data.media.len(), 2);
        assert_eq!(data.media[0].url, "https://pbs.example/p.jpg");
        assert_eq!(data.media[1].url, "https://video.example/v.mp4");
    }

    #[test]
    fn test_nested_tweets_one_level() {
        let mut inner = full_tweet();
        inner.id = "inner".to_string();
        inner.quoted_status = Some(Box::new(Tweet::stub("deep")));

        let mut outer = Tweet::stub("outer");
        outer.retweeted_status = Some(Box::new(inner));
        outer.quoted_status = Some(Box::new(Tweet::stub("quoted")));

        let data = format_tweet(&outer);
        let retweeted = data.retweeted_tweet.unwrap();
        assert_eq!(retweeted.id, "inner");
        assert!(retweeted.quoted_tweet.is_none());
        assert_eq!(data.quoted_tweet.unwrap().id, "quoted");
    }

    #[test]
    fn test_urls_and_article_present_when_source_has_them() {
        let mut tweet = Tweet::stub("7");
        tweet.urls.push(TweetUrl {
            url: "https://t.co/x".to_string(),
            expanded_url: "https://example.com/page".to_string(),
            display_url: "example.com/page".to_string(),
        });
        tweet.article = Some(TweetArticle {
            id: "a1".to_string(),
            title: "Title".to_string(),
            preview_text: "Preview".to_string(),
        });

        let data = format_tweet(&tweet);
        assert_eq!(data.urls.unwrap()[0].expanded_url, "https://example.com/page");
        assert_eq!(data.article.unwrap().title, "Title");
    }

    #[test]
    fn test_blank_screen_name_degrades_to_unknown() {
        let tweet = Tweet::stub("9").with_user(TweetUser::new("1", "", "No Handle"));
        let data = format_tweet(&tweet);

        assert_eq!(data.author.screen_name, "unknown");
        assert_eq!(data.url, "https://x.com/i/status/9");
    }

    #[test]
    fn test_payload_serialization() {
        let payload = format_payload(EventType::Bookmark, &full_tweet()).with_timestamp(1_700_000_000_000);
        let json = payload.to_json().unwrap();

        assert!(json.contains("\"event\":\"bookmark\""));
        assert!(json.contains("\"timestamp\":1700000000000"));
        assert!(json.contains("\"screen_name\":\"rustlang\""));
        assert!(json.contains("\"type\":\"photo\""));
    }
}
