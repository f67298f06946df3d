//! Delivery log writes shared by the manager and the retry queue

use crate::{DeliveryLog, LogUpdate, WebhookStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes delivery log rows, swallowing storage errors.
///
/// Terminal updates are only applied to rows that are still `pending`; a
/// second finalize is logged and ignored.
#[derive(Clone)]
pub struct DeliveryRecorder {
    store: Arc<dyn WebhookStore>,
}

impl DeliveryRecorder {
    pub fn new(store: Arc<dyn WebhookStore>) -> Self {
        Self { store }
    }

    /// Write the initial `pending` row. Returns whether the write succeeded.
    pub async fn create_pending(&self, log: DeliveryLog) -> bool {
        let id = log.id.clone();
        match self.store.put_log(log).await {
            Ok(()) => {
                debug!(log_id = %id, "Delivery log created");
                true
            }
            Err(e) => {
                warn!(log_id = %id, error = %e, "Failed to create delivery log");
                false
            }
        }
    }

    /// Record a failed retry that will be attempted again
    pub async fn record_retry(
        &self,
        id: &str,
        error: &str,
        status: Option<u16>,
        retry_count: u32,
    ) -> bool {
        self.apply(id, LogUpdate::progress(error, status, retry_count))
            .await
    }

    /// Finalize a row as `success`
    pub async fn mark_success(&self, id: &str, status: Option<u16>, retry_count: u32) -> bool {
        self.apply(id, LogUpdate::success(status, retry_count)).await
    }

    /// Finalize a row as `failed`
    pub async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        status: Option<u16>,
        retry_count: u32,
    ) -> bool {
        self.apply(id, LogUpdate::failed(error, status, retry_count))
            .await
    }

    async fn apply(&self, id: &str, update: LogUpdate) -> bool {
        let current = match self.store.get_log(id).await {
            Ok(Some(log)) => log,
            Ok(None) => {
                warn!(log_id = %id, "Delivery log missing, update skipped");
                return false;
            }
            Err(e) => {
                warn!(log_id = %id, error = %e, "Failed to read delivery log");
                return false;
            }
        };

        if current.status.is_terminal() {
            warn!(
                log_id = %id,
                status = %current.status,
                "Delivery log already finalized, update ignored"
            );
            return false;
        }

        let terminal = update.is_terminal();
        match self.store.update_log(id, update).await {
            Ok(()) => {
                if terminal {
                    debug!(log_id = %id, "Delivery log finalized");
                }
                true
            }
            Err(e) => {
                warn!(log_id = %id, error = %e, "Failed to update delivery log");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeliveryStatus, EventType, MemoryStore};

    async fn setup() -> (MemoryStore, DeliveryRecorder) {
        let store = MemoryStore::new();
        let recorder = DeliveryRecorder::new(Arc::new(store.clone()));
        let log = DeliveryLog::pending("log-1", "cfg", EventType::Like, "1", "https://e.com", "{}");
        assert!(recorder.create_pending(log).await);
        (store, recorder)
    }

    #[tokio::test]
    async fn test_second_finalize_is_noop() {
        let (store, recorder) = setup().await;

        assert!(recorder.mark_success("log-1", Some(200), 1).await);
        assert!(!recorder.mark_failed("log-1", "late failure", None, 3).await);

        let log = store.get_log("log-1").await.unwrap().unwrap();
        assert_eq!(log.status, DeliveryStatus::Success);
        assert_eq!(log.retry_count, 1);
        assert_eq!(log.response_status, Some(200));
        assert!(log.error_message.is_none());
    }

    #[tokio::test]
    async fn test_double_failed_keeps_first() {
        let (store, recorder) = setup().await;

        assert!(recorder.mark_failed("log-1", "first", Some(500), 2).await);
        assert!(!recorder.mark_failed("log-1", "second", Some(502), 3).await);

        let log = store.get_log("log-1").await.unwrap().unwrap();
        assert_eq!(log.status, DeliveryStatus::Failed);
        assert_eq!(log.error_message.as_deref(), Some("first"));
        assert_eq!(log.retry_count, 2);
    }

    #[tokio::test]
    async fn test_progress_keeps_pending() {
        let (store, recorder) = setup().await;

        assert!(recorder.record_retry("log-1", "HTTP 500: boom", Some(500), 1).await);

        let log = store.get_log("log-1").await.unwrap().unwrap();
        assert_eq!(log.status, DeliveryStatus::Pending);
        assert_eq!(log.retry_count, 1);
    }

    #[tokio::test]
    async fn test_missing_row() {
        let (_, recorder) = setup().await;
        assert!(!recorder.mark_success("nope", Some(200), 0).await);
    }
}
