//! Storage boundary for webhook configs and delivery logs

use crate::{DeliveryLog, DeliveryStatus, LogUpdate, WebhookConfig};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Record with this id does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Backend refused or failed the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed record store holding webhook configs and delivery logs.
///
/// Implementations must return configs in storage (insertion) order.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn put_config(&self, config: WebhookConfig) -> StoreResult<()>;

    /// Replace an existing config
    async fn update_config(&self, config: WebhookConfig) -> StoreResult<()>;

    async fn get_config(&self, id: &str) -> StoreResult<Option<WebhookConfig>>;

    async fn delete_config(&self, id: &str) -> StoreResult<()>;

    async fn list_configs(&self) -> StoreResult<Vec<WebhookConfig>>;

    /// Query the `enabled` index
    async fn configs_by_enabled(&self, enabled: bool) -> StoreResult<Vec<WebhookConfig>>;

    async fn put_log(&self, log: DeliveryLog) -> StoreResult<()>;

    /// Apply partial fields to an existing log row
    async fn update_log(&self, id: &str, update: LogUpdate) -> StoreResult<()>;

    async fn get_log(&self, id: &str) -> StoreResult<Option<DeliveryLog>>;

    async fn delete_log(&self, id: &str) -> StoreResult<()>;

    /// Query the `status` index
    async fn logs_by_status(&self, status: DeliveryStatus) -> StoreResult<Vec<DeliveryLog>>;

    /// Range query on `created_at`, both bounds inclusive
    async fn logs_created_between(&self, from: i64, to: i64) -> StoreResult<Vec<DeliveryLog>>;

    /// Newest first
    async fn recent_logs(&self, limit: usize) -> StoreResult<Vec<DeliveryLog>>;

    async fn count_logs(&self) -> StoreResult<usize>;

    async fn clear_logs(&self) -> StoreResult<()>;
}

/// In-process store backed by insertion-ordered vectors
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    configs: Arc<RwLock<Vec<WebhookConfig>>>,
    logs: Arc<RwLock<Vec<DeliveryLog>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every log row in insertion order
    pub fn logs(&self) -> Vec<DeliveryLog> {
        self.logs.read().clone()
    }
}

#[async_trait]
impl WebhookStore for MemoryStore {
    async fn put_config(&self, config: WebhookConfig) -> StoreResult<()> {
        let mut configs = self.configs.write();
        match configs.iter_mut().find(|c| c.id == config.id) {
            Some(existing) => *existing = config,
            None => configs.push(config),
        }
        Ok(())
    }

    async fn update_config(&self, config: WebhookConfig) -> StoreResult<()> {
        let mut configs = self.configs.write();
        let existing = configs
            .iter_mut()
            .find(|c| c.id == config.id)
            .ok_or_else(|| StoreError::NotFound(config.id.clone()))?;
        *existing = config;
        Ok(())
    }

    async fn get_config(&self, id: &str) -> StoreResult<Option<WebhookConfig>> {
        Ok(self.configs.read().iter().find(|c| c.id == id).cloned())
    }

    async fn delete_config(&self, id: &str) -> StoreResult<()> {
        self.configs.write().retain(|c| c.id != id);
        Ok(())
    }

    async fn list_configs(&self) -> StoreResult<Vec<WebhookConfig>> {
        Ok(self.configs.read().clone())
    }

    async fn configs_by_enabled(&self, enabled: bool) -> StoreResult<Vec<WebhookConfig>> {
        Ok(self
            .configs
            .read()
            .iter()
            .filter(|c| c.enabled == enabled)
            .cloned()
            .collect())
    }

    async fn put_log(&self, log: DeliveryLog) -> StoreResult<()> {
        let mut logs = self.logs.write();
        match logs.iter_mut().find(|l| l.id == log.id) {
            Some(existing) => *existing = log,
            None => logs.push(log),
        }
        Ok(())
    }

    async fn update_log(&self, id: &str, update: LogUpdate) -> StoreResult<()> {
        let mut logs = self.logs.write();
        let log = logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        log.apply(&update);
        Ok(())
    }

    async fn get_log(&self, id: &str) -> StoreResult<Option<DeliveryLog>> {
        Ok(self.logs.read().iter().find(|l| l.id == id).cloned())
    }

    async fn delete_log(&self, id: &str) -> StoreResult<()> {
        self.logs.write().retain(|l| l.id != id);
        Ok(())
    }

    async fn logs_by_status(&self, status: DeliveryStatus) -> StoreResult<Vec<DeliveryLog>> {
        Ok(self
            .logs
            .read()
            .iter()
            .filter(|l| l.status == status)
            .cloned()
            .collect())
    }

    async fn logs_created_between(&self, from: i64, to: i64) -> StoreResult<Vec<DeliveryLog>> {
        Ok(self
            .logs
            .read()
            .iter()
            .filter(|l| l.created_at >= from && l.created_at <= to)
            .cloned()
            .collect())
    }

    async fn recent_logs(&self, limit: usize) -> StoreResult<Vec<DeliveryLog>> {
        let mut logs: Vec<DeliveryLog> = self.logs.read().iter().rev().cloned().collect();
        // stable: equal timestamps keep newest-inserted first
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(limit);
        Ok(logs)
    }

    async fn count_logs(&self) -> StoreResult<usize> {
        Ok(self.logs.read().len())
    }

    async fn clear_logs(&self) -> StoreResult<()> {
        self.logs.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventType;

    fn log(id: &str, created_at: i64) -> DeliveryLog {
        let mut log = DeliveryLog::pending(id, "cfg", EventType::Like, "1", "https://e.com", "{}");
        log.created_at = created_at;
        log
    }

    #[tokio::test]
    async fn test_configs_keep_insertion_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store
                .put_config(WebhookConfig::builder(id, "https://e.com").id(id).build())
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .list_configs()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_config_enabled_index() {
        let store = MemoryStore::new();
        store
            .put_config(WebhookConfig::builder("on", "https://e.com").id("on").build())
            .await
            .unwrap();
        store
            .put_config(
                WebhookConfig::builder("off", "https://e.com")
                    .id("off")
                    .enabled(false)
                    .build(),
            )
            .await
            .unwrap();

        let enabled = store.configs_by_enabled(true).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "on");
        assert_eq!(store.configs_by_enabled(false).await.unwrap()[0].id, "off");
    }

    #[tokio::test]
    async fn test_update_missing_config() {
        let store = MemoryStore::new();
        let result = store
            .update_config(WebhookConfig::builder("x", "https://e.com").id("x").build())
            .await;
        assert_eq!(result, Err(StoreError::NotFound("x".to_string())));
    }

    #[tokio::test]
    async fn test_delete_config() {
        let store = MemoryStore::new();
        store
            .put_config(WebhookConfig::builder("x", "https://e.com").id("x").build())
            .await
            .unwrap();
        store.delete_config("x").await.unwrap();
        assert!(store.get_config("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_update_and_status_index() {
        let store = MemoryStore::new();
        store.put_log(log("a", 1)).await.unwrap();
        store.put_log(log("b", 2)).await.unwrap();

        store
            .update_log("a", LogUpdate::success(Some(200), 0))
            .await
            .unwrap();

        let success = store.logs_by_status(DeliveryStatus::Success).await.unwrap();
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].id, "a");
        assert_eq!(store.logs_by_status(DeliveryStatus::Pending).await.unwrap().len(), 1);

        assert!(store.update_log("missing", LogUpdate::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_log_range_and_recent() {
        let store = MemoryStore::new();
        for (id, ts) in [("a", 10), ("b", 20), ("c", 30), ("d", 20)] {
            store.put_log(log(id, ts)).await.unwrap();
        }

        let ranged: Vec<String> = store
            .logs_created_between(15, 30)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ranged, vec!["b", "c", "d"]);

        let recent: Vec<String> = store
            .recent_logs(3)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(recent, vec!["c", "d", "b"]);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let store = MemoryStore::new();
        store.put_log(log("a", 1)).await.unwrap();
        store.put_log(log("b", 2)).await.unwrap();
        assert_eq!(store.count_logs().await.unwrap(), 2);

        store.delete_log("a").await.unwrap();
        assert_eq!(store.count_logs().await.unwrap(), 1);

        store.clear_logs().await.unwrap();
        assert_eq!(store.count_logs().await.unwrap(), 0);
    }
}
