//! Outgoing webhook delivery for tweetcap
//!
//! Captured tweet events (`like`, `bookmark`, `view`) are formatted into a
//! JSON payload and POSTed to every enabled, subscribed webhook config.
//! Failed deliveries are retried with exponential backoff up to each
//! config's limit, and every delivery leaves an auditable log row.
//!
//! # Features
//!
//! - **Payload Formatting**: Tweets (full or stub) to a stable wire format
//! - **Sender**: One POST per call, every outcome folded into a result
//! - **Retry Queue**: Single-timer scheduler with capped exponential backoff
//! - **Delivery Manager**: Config mirror, sequential fan-out, delivery logs
//! - **Storage Boundary**: Pluggable [`WebhookStore`] with an in-memory default
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tweetcap_webhooks::{
//!     DeliveryManager, DeliveryOptions, DeliveryRecorder, EventType, MemoryStore,
//!     ReqwestTransport, RetryQueue, Sender, Tweet, WebhookConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = DeliveryOptions::default();
//!     let transport = Arc::new(ReqwestTransport::new(&options.user_agent)?);
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let sender = Sender::new(transport, options);
//!     let queue = RetryQueue::new(sender.clone(), DeliveryRecorder::new(store.clone()));
//!     let manager = DeliveryManager::new(store, sender, queue.clone());
//!     queue.start();
//!
//!     manager
//!         .add_config(
//!             WebhookConfig::builder("archive", "https://example.com/hooks/tweets")
//!                 .events([EventType::Like, EventType::Bookmark])
//!                 .build(),
//!         )
//!         .await?;
//!
//!     let report = manager
//!         .trigger_webhooks(EventType::Like, &Tweet::stub("1790000000000000000"))
//!         .await;
//!     println!("delivered to {} webhook(s)", report.delivered);
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```

mod config;
mod delivery;
mod error;
mod event;
mod manager;
#[cfg(any(test, feature = "testing"))]
mod mock;
mod options;
mod payload;
mod queue;
mod recorder;
mod retry;
mod sender;
mod store;
mod transport;
mod tweet;

pub use config::{WebhookConfig, WebhookConfigBuilder, WebhookConfigPatch};
pub use delivery::{DeliveryLog, DeliveryStatus, LogUpdate};
pub use error::WebhookError;
pub use event::EventType;
pub use manager::{DeliveryManager, DispatchOutcome, DispatchReport, TestOutcome};
#[cfg(any(test, feature = "testing"))]
pub use mock::MockTransport;
pub use options::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_TEST_TIMEOUT, DeliveryOptions, DeliveryOptionsBuilder};
pub use payload::{
    ArticleData, AuthorData, MediaData, StatsData, TweetData, UNKNOWN_SCREEN_NAME, UrlData,
    WebhookPayload, format_payload, format_tweet, tweet_url,
};
pub use queue::{NewRetryItem, RetryQueue, RetryQueueItem};
pub use recorder::DeliveryRecorder;
pub use retry::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, backoff};
pub use sender::{DeliveryResult, SendOptions, Sender};
pub use store::{MemoryStore, StoreError, StoreResult, WebhookStore};
pub use transport::{HttpRequest, ReqwestTransport, Transport, TransportOutcome};
pub use tweet::{Tweet, TweetArticle, TweetMedia, TweetUrl, TweetUser};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
