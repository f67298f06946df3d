//! tweetcap: forwards captured tweet events to webhooks
//!
//! This crate wires the delivery pipeline from [`tweetcap_webhooks`] to the
//! settings from [`tweetcap_config`] and exposes the event boundary that the
//! capture layer calls whenever a tweet is liked, bookmarked or viewed.
//!
//! # Example
//!
//! ```rust,no_run
//! use tweetcap::{EventType, Tweet, Tweetcap, WebhookConfig};
//! use tweetcap::config::SettingsLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsLoader::new().file("tweetcap.toml").load()?;
//!     tweetcap::logging::init(&settings.logging);
//!
//!     let app = Tweetcap::builder().settings(settings).build().await?;
//!     app.manager()
//!         .add_config(
//!             WebhookConfig::builder("archive", "https://example.com/hooks/tweets")
//!                 .all_events()
//!                 .build(),
//!         )
//!         .await?;
//!
//!     app.on_event(EventType::Like, &[Tweet::stub("1790000000000000000")])
//!         .await;
//!
//!     app.shutdown();
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use tweetcap_config as config;
pub use tweetcap_webhooks as webhooks;

pub use tweetcap_webhooks::{
    DeliveryLog, DeliveryManager, DeliveryStatus, DispatchReport, EventType, RetryQueue, Tweet,
    WebhookConfig, WebhookConfigPatch,
};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use tweetcap_config::{ConfigError, DeliverySettings, Settings};
use tweetcap_webhooks::{
    BackoffPolicy, DeliveryOptions, DeliveryRecorder, MemoryStore, ReqwestTransport, Sender,
    Transport, WebhookError, WebhookStore,
};

/// Errors raised while assembling the application
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map settings onto the webhook crate's options
pub fn delivery_options(settings: &DeliverySettings) -> DeliveryOptions {
    DeliveryOptions::builder()
        .request_timeout(Duration::from_millis(settings.request_timeout_ms))
        .test_timeout(Duration::from_millis(settings.test_timeout_ms))
        .user_agent(settings.user_agent.clone())
        .backoff(BackoffPolicy::new(
            Duration::from_millis(settings.retry_base_delay_ms),
            Duration::from_millis(settings.retry_max_delay_ms),
        ))
        .max_response_chars(settings.max_response_chars)
        .build()
}

/// The assembled delivery pipeline. Cloning shares it.
#[derive(Clone)]
pub struct Tweetcap {
    settings: Arc<Settings>,
    manager: Arc<DeliveryManager>,
    queue: RetryQueue,
}

impl Tweetcap {
    pub fn builder() -> TweetcapBuilder {
        TweetcapBuilder::default()
    }

    /// Event boundary: forward captured tweets to every matching webhook.
    ///
    /// One tweet is a single trigger, several are a batch. Never fails;
    /// delivery problems end up in the delivery logs.
    pub async fn on_event(&self, event: EventType, tweets: &[Tweet]) -> DispatchReport {
        match tweets {
            [] => {
                debug!(event = %event, "Event without tweets ignored");
                DispatchReport::default()
            }
            [tweet] => self.manager.trigger_webhooks(event, tweet).await,
            tweets => self.manager.trigger_webhooks_batch(event, tweets).await,
        }
    }

    pub fn manager(&self) -> &DeliveryManager {
        &self.manager
    }

    pub fn retry_queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stop the retry queue. Queued retries are not persisted.
    pub fn shutdown(&self) {
        self.manager.shutdown();
        info!("tweetcap stopped");
    }
}

/// Builder for [`Tweetcap`]
#[derive(Default)]
pub struct TweetcapBuilder {
    settings: Option<Settings>,
    store: Option<Arc<dyn WebhookStore>>,
    transport: Option<Arc<dyn Transport>>,
}

impl TweetcapBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Storage for configs and delivery logs (default: in memory)
    pub fn store(mut self, store: Arc<dyn WebhookStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// HTTP transport (default: reqwest with the configured user agent)
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Assemble the pipeline, load configs from the store, and start the
    /// retry queue unless disabled in settings
    pub async fn build(self) -> Result<Tweetcap> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        let options = delivery_options(&settings.delivery);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&options.user_agent)?),
        };
        let store: Arc<dyn WebhookStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };

        let sender = Sender::new(transport, options);
        let queue = RetryQueue::new(sender.clone(), DeliveryRecorder::new(store.clone()));
        let manager = DeliveryManager::new(store, sender, queue.clone());

        let configs = manager.load_configs().await?;
        if settings.delivery.start_retry_queue {
            queue.start();
        }

        info!(
            configs,
            retry_queue = queue.is_running(),
            "tweetcap ready"
        );

        Ok(Tweetcap {
            settings: Arc::new(settings),
            manager: Arc::new(manager),
            queue,
        })
    }
}
