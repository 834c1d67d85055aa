//! Dispatch processor orchestration

mod batch;
mod dispatch;
mod retry;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures_util::future::join_all;
use herald_common::{Message, internal};
use herald_metrics::DispatchMetrics;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::warn;

use crate::{
    BulkReport, ConfigError, DispatchConfig, DispatchError, MetricsSnapshot, ShutdownMode,
    Transport,
    metrics::MetricsAggregator,
    queue::{Completion, Queue, QueueItem},
};

/// Lifecycle of the dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// Nothing was ever enqueued
    #[default]
    Idle,
    /// A loop is running
    Draining,
    /// The last loop exited with an empty queue and nothing in flight
    Completed,
}

/// Everything the dispatch loop decides on, behind one lock.
#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    pub(crate) queue: Queue,
    pub(crate) in_flight: usize,
    pub(crate) pending_retries: usize,
    pub(crate) loop_state: LoopState,
    pub(crate) closed: bool,
    pub(crate) next_batch_id: u64,
}

/// State shared by the loop, batches and retry timers.
pub(crate) struct Shared {
    pub(crate) config: DispatchConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) state: Mutex<DispatchState>,
    pub(crate) wake: Notify,
    pub(crate) metrics: MetricsAggregator,
    pub(crate) telemetry: Option<&'static DispatchMetrics>,
    pub(crate) tracker: TaskTracker,
    pub(crate) cancel: CancellationToken,
    next_item_id: AtomicU64,
}

impl Shared {
    /// Put a fresh item at the tail of the queue, starting a loop if none is
    /// running. Returns `false`, dropping the item, once shutdown has begun.
    ///
    /// The closed check and the spawn happen under the state lock so shutdown
    /// can never observe an empty tracker between the enqueue and the loop
    /// starting.
    pub(crate) fn push(self: &Arc<Self>, item: QueueItem) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        state.queue.push(item);
        self.start_or_wake(&mut state);
        true
    }

    /// Move an item from its retry timer back into the queue.
    pub(crate) fn requeue(self: &Arc<Self>, item: QueueItem) {
        let mut state = self.state.lock();
        state.pending_retries = state.pending_retries.saturating_sub(1);
        state.queue.push(item);
        self.start_or_wake(&mut state);
    }

    fn start_or_wake(self: &Arc<Self>, state: &mut DispatchState) {
        self.publish(state);

        if state.loop_state == LoopState::Draining {
            self.wake.notify_one();
        } else {
            state.loop_state = LoopState::Draining;
            self.tracker.spawn(dispatch::run(Arc::clone(self)));
        }
    }

    /// Mirror the queue depth to the OpenTelemetry gauge.
    pub(crate) fn publish(&self, state: &DispatchState) {
        if let Some(telemetry) = self.telemetry {
            telemetry.set_queue_state(
                state.queue.len() as u64,
                state.in_flight as u64,
                state.pending_retries as u64,
            );
        }
    }
}

/// Bulk message dispatcher.
///
/// Messages are queued, drained in batches of `batch_size`, and delivered
/// through the [`Transport`] with at most `concurrency_limit` batches in
/// flight. Failed deliveries are retried with exponential backoff until
/// `retry.max_attempts` is reached.
///
/// Cloning is cheap and every clone drives the same queue.
///
/// The dispatcher spawns onto the ambient Tokio runtime, so [`send`](Self::send)
/// must be called from within one.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("loop_state", &self.loop_state())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher delivering through `transport`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is unusable.
    pub fn new(config: DispatchConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;

        internal!(
            level = DEBUG,
            "Dispatcher created with batch_size={}, concurrency_limit={}, max_attempts={}",
            config.batch_size,
            config.concurrency_limit,
            config.retry.max_attempts
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport,
                state: Mutex::new(DispatchState::default()),
                wake: Notify::new(),
                metrics: MetricsAggregator::new(),
                telemetry: herald_metrics::metrics().map(|metrics| &metrics.dispatch),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                next_item_id: AtomicU64::new(0),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }

    /// Queue a message for delivery.
    ///
    /// Returns immediately; the [`Completion`] resolves once the message is
    /// delivered or has failed for good. After shutdown has begun the
    /// completion resolves straight away with [`DispatchError::ShuttingDown`].
    pub fn send(&self, message: Message) -> Completion {
        let id = self.shared.next_item_id.fetch_add(1, Ordering::Relaxed);
        let (item, completion) = QueueItem::new(id, Arc::new(message));

        if self.shared.push(item) {
            completion
        } else {
            Completion::failed(id, DispatchError::ShuttingDown)
        }
    }

    /// Queue every message and wait for all of them to resolve.
    ///
    /// Outcomes are positional: `report.outcomes()[i]` belongs to the
    /// `i`-th message. Individual failures never fail the whole call.
    pub async fn send_bulk<I>(&self, messages: I) -> BulkReport
    where
        I: IntoIterator<Item = Message>,
    {
        let completions: Vec<Completion> = messages.into_iter().map(|message| self.send(message)).collect();
        BulkReport::new(join_all(completions).await)
    }

    /// Current counters and queue depth.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (queue_length, in_flight_batches, pending_retries) = {
            let state = self.shared.state.lock();
            (state.queue.len(), state.in_flight, state.pending_retries)
        };

        MetricsSnapshot {
            totals: self.shared.metrics.totals(),
            queue_length,
            in_flight_batches,
            pending_retries,
        }
    }

    #[must_use]
    pub fn loop_state(&self) -> LoopState {
        self.shared.state.lock().loop_state
    }

    /// Stop accepting messages and wait for outstanding work to finish.
    ///
    /// See [`ShutdownMode`] for what happens to queued and retrying items.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        internal!(level = INFO, "Dispatcher shutting down ({mode:?})");

        self.shared.state.lock().closed = true;

        if mode == ShutdownMode::Abandon {
            self.shared.cancel.cancel();
            self.shared.wake.notify_one();
        }

        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        let snapshot = self.snapshot();
        internal!(
            level = INFO,
            "Dispatcher shutdown complete: {} sent, {} failed",
            snapshot.totals.total_sent,
            snapshot.totals.total_failed
        );
    }

    /// [`shutdown`](Self::shutdown), bounded by `timeout`.
    ///
    /// Work still running when the timeout expires keeps running in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ShutdownTimeout`] if the wait was cut short.
    pub async fn shutdown_with_timeout(
        &self,
        mode: ShutdownMode,
        timeout: Duration,
    ) -> Result<(), DispatchError> {
        tokio::time::timeout(timeout, self.shutdown(mode))
            .await
            .map_err(|_| {
                let snapshot = self.snapshot();
                warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    queued = snapshot.queue_length,
                    in_flight = snapshot.in_flight_batches,
                    retrying = snapshot.pending_retries,
                    "Shutdown timeout exceeded with work outstanding"
                );
                DispatchError::ShutdownTimeout { timeout }
            })
    }
}
