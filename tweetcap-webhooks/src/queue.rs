//! Retry queue for failed webhook deliveries.
//!
//! A single timer is armed for the earliest `next_retry_at` among pending
//! items. When it fires, every due item is taken out of the pending set and
//! re-sent; failures are re-added with a longer backoff until the item's
//! retry limit is reached, at which point its delivery log is finalized as
//! `failed`.
//!
//! Pending items live in memory only: stopping the queue or dropping the
//! process discards them.

use crate::{BackoffPolicy, DeliveryRecorder, SendOptions, Sender, WebhookPayload};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A retry request, before the queue has scheduled it
#[derive(Debug, Clone)]
pub struct NewRetryItem {
    /// Delivery log row updated with the outcome
    pub log_id: String,
    pub config_id: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub payload: WebhookPayload,
    /// Retries already performed; 0 for the first retry
    pub retry_count: u32,
    pub max_retries: u32,
}

impl NewRetryItem {
    fn schedule(self, next_retry_at: Instant) -> RetryQueueItem {
        RetryQueueItem {
            log_id: self.log_id,
            config_id: self.config_id,
            url: self.url,
            headers: self.headers,
            payload: self.payload,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            next_retry_at,
        }
    }
}

/// A scheduled retry. Invariant: `retry_count < max_retries`.
#[derive(Debug, Clone)]
pub struct RetryQueueItem {
    pub log_id: String,
    pub config_id: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub payload: WebhookPayload,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Instant,
}

impl RetryQueueItem {
    fn into_next(self) -> NewRetryItem {
        NewRetryItem {
            log_id: self.log_id,
            config_id: self.config_id,
            url: self.url,
            headers: self.headers,
            payload: self.payload,
            retry_count: self.retry_count + 1,
            max_retries: self.max_retries,
        }
    }
}

struct ArmedTimer {
    generation: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct QueueState {
    /// Insertion order
    pending: Vec<RetryQueueItem>,
    timer: Option<ArmedTimer>,
    running: bool,
    generation: u64,
}

struct Shared {
    state: Mutex<QueueState>,
    processing: AtomicBool,
    sender: Sender,
    recorder: DeliveryRecorder,
    backoff: BackoffPolicy,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.handle.abort();
        }
    }
}

/// Clears the processing flag when a pass ends, even by unwinding
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Timer-driven retry scheduler. Cloning shares the same queue.
///
/// Must be used from within a Tokio runtime: arming the timer spawns a task.
#[derive(Clone)]
pub struct RetryQueue {
    shared: Arc<Shared>,
}

impl RetryQueue {
    /// Create a stopped queue; backoff comes from the sender's options
    pub fn new(sender: Sender, recorder: DeliveryRecorder) -> Self {
        let backoff = sender.options().backoff;
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                processing: AtomicBool::new(false),
                sender,
                recorder,
                backoff,
            }),
        }
    }

    /// Schedule an item at `now + backoff(retry_count)`
    pub fn add(&self, item: NewRetryItem) {
        if item.retry_count >= item.max_retries {
            warn!(
                log_id = %item.log_id,
                retry_count = item.retry_count,
                max_retries = item.max_retries,
                "Refusing retry past its limit"
            );
            return;
        }

        let delay = self.shared.backoff.delay_for(item.retry_count);
        let next_retry_at = Instant::now() + delay;
        debug!(
            log_id = %item.log_id,
            config_id = %item.config_id,
            retry_count = item.retry_count,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Retry scheduled"
        );

        let mut state = self.shared.state.lock();
        state.pending.push(item.schedule(next_retry_at));
        self.arm(&mut state);
    }

    /// Arm the timer for the current pending set
    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        if !state.running {
            state.running = true;
            info!(pending = state.pending.len(), "Retry queue started");
        }
        self.arm(&mut state);
    }

    /// Cancel future wake-ups. Pending items stay in memory; an attempt
    /// already in flight runs to completion.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.running = false;
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }
        self.shared.processing.store(false, Ordering::Release);
        info!(pending = state.pending.len(), "Retry queue stopped");
    }

    /// Attempt every due item once. Overlapping calls return immediately.
    pub async fn process_queue(&self) {
        if self.shared.processing.swap(true, Ordering::AcqRel) {
            debug!("Retry queue pass already in progress");
            return;
        }
        let guard = ProcessingGuard {
            flag: &self.shared.processing,
        };

        let now = Instant::now();
        let mut due = {
            let mut state = self.shared.state.lock();
            let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|item| item.next_retry_at <= now);
            state.pending = waiting;
            due
        };
        // stable sort keeps insertion order among equal due times
        due.sort_by_key(|item| item.next_retry_at);

        if !due.is_empty() {
            debug!(count = due.len(), "Processing due retries");
        }

        for item in due {
            let fallback = item.clone();
            let attempt = AssertUnwindSafe(self.process_item(item)).catch_unwind().await;
            if let Err(panic) = attempt {
                error!(
                    log_id = %fallback.log_id,
                    panic = %panic_message(panic.as_ref()),
                    "Retry attempt panicked"
                );
                self.handle_failure(
                    fallback,
                    "Internal error while retrying delivery".to_string(),
                    None,
                )
                .await;
            }
        }

        drop(guard);
        let mut state = self.shared.state.lock();
        self.arm(&mut state);
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().pending.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Whether a wake-up is scheduled
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().timer.is_some()
    }

    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::Acquire)
    }

    /// When the armed timer fires
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.shared.state.lock().timer.as_ref().map(|t| t.deadline)
    }

    /// Snapshot of pending items in insertion order
    pub fn pending(&self) -> Vec<RetryQueueItem> {
        self.shared.state.lock().pending.clone()
    }

    async fn process_item(&self, item: RetryQueueItem) {
        let attempt = item.retry_count + 1;
        debug!(log_id = %item.log_id, attempt, "Retrying webhook delivery");

        let send = SendOptions::new(&item.url).with_headers(item.headers.clone());
        let result = self.shared.sender.send(&item.payload, send).await;

        if result.success {
            info!(
                log_id = %item.log_id,
                config_id = %item.config_id,
                attempt,
                "Webhook delivered on retry"
            );
            self.shared
                .recorder
                .mark_success(&item.log_id, result.status, attempt)
                .await;
        } else {
            self.handle_failure(item, result.error_message(), result.status)
                .await;
        }
    }

    async fn handle_failure(&self, item: RetryQueueItem, error: String, status: Option<u16>) {
        let attempt = item.retry_count + 1;
        if attempt < item.max_retries {
            self.shared
                .recorder
                .record_retry(&item.log_id, &error, status, attempt)
                .await;
            self.add(item.into_next());
        } else {
            warn!(
                log_id = %item.log_id,
                config_id = %item.config_id,
                retries = attempt,
                error = %error,
                "Webhook retries exhausted"
            );
            self.shared
                .recorder
                .mark_failed(&item.log_id, &error, status, attempt)
                .await;
        }
    }

    /// Keep a timer aimed at the earliest pending item
    fn arm(&self, state: &mut QueueState) {
        if !state.running {
            return;
        }
        let Some(earliest) = state.pending.iter().map(|item| item.next_retry_at).min() else {
            return;
        };
        if state.timer.as_ref().is_some_and(|t| t.deadline <= earliest) {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }

        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::downgrade(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(earliest).await;
            Self::on_timer(shared, generation).await;
        });

        state.timer = Some(ArmedTimer {
            generation,
            deadline: earliest,
            handle,
        });
    }

    async fn on_timer(shared: Weak<Shared>, generation: u64) {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        {
            let mut state = shared.state.lock();
            let ours = state
                .timer
                .as_ref()
                .is_some_and(|t| t.generation == generation);
            if !ours {
                return;
            }
            // detach before processing so a re-arm cannot abort this pass
            state.timer = None;
        }
        RetryQueue { shared }.process_queue().await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
