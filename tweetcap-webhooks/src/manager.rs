//! Delivery manager: config mirror, event fan-out and delivery logging

use crate::{
    DeliveryLog, DeliveryRecorder, DeliveryStatus, EventType, NewRetryItem, Result, RetryQueue,
    SendOptions, Sender, Tweet, WebhookConfig, WebhookConfigPatch, WebhookError, WebhookPayload,
    WebhookStore, format_payload,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What happened to a single (event, config) delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// First attempt succeeded
    Delivered,
    /// First attempt failed and the retry queue took over
    Retrying,
    /// First attempt failed and the config does not retry
    Failed,
}

/// Tally of first-attempt outcomes for one trigger call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub retrying: usize,
    pub failed: usize,
}

impl DispatchReport {
    /// Number of deliveries attempted
    pub fn total(&self) -> usize {
        self.delivered + self.retrying + self.failed
    }

    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered => self.delivered += 1,
            DispatchOutcome::Retrying => self.retrying += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

/// Result of a connectivity test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
}

/// Owns the webhook config mirror and drives deliveries for incoming events.
///
/// Fan-out is sequential: the delivery and log writes for one config finish
/// before the next config is attempted.
pub struct DeliveryManager {
    store: Arc<dyn WebhookStore>,
    sender: Sender,
    queue: RetryQueue,
    recorder: DeliveryRecorder,
    configs: RwLock<Vec<WebhookConfig>>,
    revision: watch::Sender<u64>,
    last_log_timestamp: Mutex<i64>,
}

impl DeliveryManager {
    /// Create a manager with an empty mirror; call [`load_configs`](Self::load_configs) next
    pub fn new(store: Arc<dyn WebhookStore>, sender: Sender, queue: RetryQueue) -> Self {
        let recorder = DeliveryRecorder::new(store.clone());
        let (revision, _) = watch::channel(0);
        Self {
            store,
            sender,
            queue,
            recorder,
            configs: RwLock::new(Vec::new()),
            revision,
            last_log_timestamp: Mutex::new(0),
        }
    }

    /// Refresh the mirror from storage.
    ///
    /// On a storage error the previous mirror is kept.
    pub async fn load_configs(&self) -> Result<usize> {
        let configs = match self.store.list_configs().await {
            Ok(configs) => configs,
            Err(e) => {
                warn!(error = %e, "Failed to load webhook configs, keeping previous set");
                return Err(e.into());
            }
        };

        let count = configs.len();
        *self.configs.write() = configs;
        self.revision.send_modify(|revision| *revision += 1);
        debug!(count, "Webhook configs loaded");
        Ok(count)
    }

    /// Change counter bumped after every successful reload
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Snapshot of the mirror in storage order
    pub fn configs(&self) -> Vec<WebhookConfig> {
        self.configs.read().clone()
    }

    pub fn get_config(&self, id: &str) -> Option<WebhookConfig> {
        self.configs.read().iter().find(|c| c.id == id).cloned()
    }

    /// Enabled configs subscribed to `event`, in storage order
    pub fn get_configs_for_event(&self, event: EventType) -> Vec<WebhookConfig> {
        self.configs
            .read()
            .iter()
            .filter(|c| c.enabled && c.is_subscribed_to(event))
            .cloned()
            .collect()
    }

    /// Validate and persist a new config
    pub async fn add_config(&self, config: WebhookConfig) -> Result<WebhookConfig> {
        config.validate()?;

        let written = self.store.put_config(config.clone()).await;
        self.reload_after_write().await;
        written?;

        info!(config_id = %config.id, name = %config.name, url = %config.url, "Webhook config added");
        Ok(config)
    }

    /// Apply a partial update to a stored config
    pub async fn update_config(&self, id: &str, patch: WebhookConfigPatch) -> Result<WebhookConfig> {
        let mut config = self
            .store
            .get_config(id)
            .await?
            .ok_or_else(|| WebhookError::ConfigNotFound(id.to_string()))?;
        config.apply(patch);
        config.validate()?;

        let written = self.store.update_config(config.clone()).await;
        self.reload_after_write().await;
        written?;

        info!(config_id = %id, "Webhook config updated");
        Ok(config)
    }

    pub async fn delete_config(&self, id: &str) -> Result<()> {
        if self.store.get_config(id).await?.is_none() {
            return Err(WebhookError::ConfigNotFound(id.to_string()));
        }

        let deleted = self.store.delete_config(id).await;
        self.reload_after_write().await;
        deleted?;

        info!(config_id = %id, "Webhook config deleted");
        Ok(())
    }

    /// Deliver one event to every matching config
    pub async fn trigger_webhooks(&self, event: EventType, tweet: &Tweet) -> DispatchReport {
        let configs = self.get_configs_for_event(event);
        let mut report = DispatchReport::default();
        if configs.is_empty() {
            debug!(event = %event, tweet_id = %tweet.id, "No webhooks subscribed");
            return report;
        }

        let payload = format_payload(event, tweet);
        for config in &configs {
            report.record(self.send_webhook(config, &payload, &tweet.id, event).await);
        }

        debug!(
            event = %event,
            tweet_id = %tweet.id,
            delivered = report.delivered,
            retrying = report.retrying,
            failed = report.failed,
            "Webhooks triggered"
        );
        report
    }

    /// Deliver one event per tweet; every config gets tweet N before tweet N+1
    pub async fn trigger_webhooks_batch(&self, event: EventType, tweets: &[Tweet]) -> DispatchReport {
        let configs = self.get_configs_for_event(event);
        let mut report = DispatchReport::default();
        if configs.is_empty() || tweets.is_empty() {
            return report;
        }

        for tweet in tweets {
            let payload = format_payload(event, tweet);
            for config in &configs {
                report.record(self.send_webhook(config, &payload, &tweet.id, event).await);
            }
        }

        info!(
            event = %event,
            tweets = tweets.len(),
            configs = configs.len(),
            delivered = report.delivered,
            retrying = report.retrying,
            failed = report.failed,
            "Webhook batch triggered"
        );
        report
    }

    /// Send a synthetic event to check that a target is reachable
    pub async fn test_webhook(&self, url: &str, headers: HashMap<String, String>) -> TestOutcome {
        let result = self.sender.test(url, headers).await;
        if result.success {
            let status = result
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            TestOutcome {
                success: true,
                message: format!("Webhook test succeeded (HTTP {})", status),
            }
        } else {
            TestOutcome {
                success: false,
                message: result.error_message(),
            }
        }
    }

    /// Newest first; empty on storage errors
    pub async fn recent_logs(&self, limit: usize) -> Vec<DeliveryLog> {
        self.store.recent_logs(limit).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read delivery logs");
            Vec::new()
        })
    }

    pub async fn get_log(&self, id: &str) -> Option<DeliveryLog> {
        self.store.get_log(id).await.unwrap_or_else(|e| {
            warn!(log_id = %id, error = %e, "Failed to read delivery log");
            None
        })
    }

    pub async fn logs_by_status(&self, status: DeliveryStatus) -> Vec<DeliveryLog> {
        self.store.logs_by_status(status).await.unwrap_or_else(|e| {
            warn!(status = %status, error = %e, "Failed to query delivery logs");
            Vec::new()
        })
    }

    pub async fn count_logs(&self) -> usize {
        self.store.count_logs().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count delivery logs");
            0
        })
    }

    /// Remove every delivery log row. Returns whether the store accepted it.
    pub async fn clear_logs(&self) -> bool {
        match self.store.clear_logs().await {
            Ok(()) => {
                info!("Delivery logs cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear delivery logs");
                false
            }
        }
    }

    pub fn retry_queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Stop retry wake-ups; queued retries are dropped with the process
    pub fn shutdown(&self) {
        let pending = self.queue.len();
        if pending > 0 {
            warn!(pending, "Shutting down with retries still queued");
        }
        self.queue.stop();
    }

    async fn send_webhook(
        &self,
        config: &WebhookConfig,
        payload: &WebhookPayload,
        entity_id: &str,
        event: EventType,
    ) -> DispatchOutcome {
        let log_id = format!("webhook-{}-{}-{}", event, entity_id, self.next_log_timestamp());
        let body = payload.to_json().unwrap_or_else(|e| {
            warn!(log_id = %log_id, error = %e, "Failed to serialize payload for delivery log");
            String::new()
        });

        self.recorder
            .create_pending(DeliveryLog::pending(
                &log_id, &config.id, event, entity_id, &config.url, body,
            ))
            .await;

        let send = SendOptions::new(&config.url).with_headers(config.headers.clone());
        let result = self.sender.send(payload, send).await;

        if result.success {
            self.recorder.mark_success(&log_id, result.status, 0).await;
            return DispatchOutcome::Delivered;
        }

        let error = result.error_message();
        if config.allows_retry() {
            self.recorder
                .record_retry(&log_id, &error, result.status, 0)
                .await;
            self.queue.add(NewRetryItem {
                log_id,
                config_id: config.id.clone(),
                url: config.url.clone(),
                headers: config.headers.clone(),
                payload: payload.clone(),
                retry_count: 0,
                max_retries: config.max_retries,
            });
            DispatchOutcome::Retrying
        } else {
            warn!(
                log_id = %log_id,
                config_id = %config.id,
                error = %error,
                "Webhook delivery failed, retries disabled"
            );
            self.recorder
                .mark_failed(&log_id, &error, result.status, 0)
                .await;
            DispatchOutcome::Failed
        }
    }

    async fn reload_after_write(&self) {
        // load_configs already logs the failure
        let _ = self.load_configs().await;
    }

    /// Millisecond clock that never repeats a value within the process
    fn next_log_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_log_timestamp.lock();
        let ts = now.max(*last + 1);
        *last = ts;
        ts
    }
}
