//! Dispatcher metrics
//!
//! Tracks outbound bulk dispatch including:
//! - Batches dispatched and their wall-clock durations
//! - Messages delivered, permanently failed, and retried
//! - Attempts needed per delivered message
//! - Queue depth by state (queued, in flight, awaiting retry)

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};

use crate::MetricsError;

/// Dispatcher metrics collector
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Total number of batches handed to the batch processor
    batches_total: Counter<u64>,

    /// Distribution of batch durations, from first delivery to settlement
    batch_duration_seconds: Histogram<f64>,

    /// Total number of messages delivered successfully
    messages_sent: Counter<u64>,

    /// Total number of messages that reached a terminal failure
    messages_failed: Counter<u64>,

    /// Total number of retries scheduled
    messages_retried: Counter<u64>,

    /// Distribution of attempts needed before success
    attempts_per_message: Histogram<u64>,

    // Shared with the observable gauge callback
    queued: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    retrying: Arc<AtomicU64>,
}

impl DispatchMetrics {
    /// Create a new dispatcher metrics collector
    ///
    /// # Errors
    ///
    /// Returns an error if metric instruments cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let meter = meter();

        let batches_total = meter
            .u64_counter("herald.dispatch.batches.total")
            .with_description("Total number of batches dispatched")
            .build();

        let batch_duration_seconds = meter
            .f64_histogram("herald.dispatch.batch.duration.seconds")
            .with_description("Distribution of batch durations")
            .build();

        let messages_sent = meter
            .u64_counter("herald.dispatch.messages.sent.total")
            .with_description("Total number of messages delivered successfully")
            .build();

        let messages_failed = meter
            .u64_counter("herald.dispatch.messages.failed.total")
            .with_description("Total number of messages that failed permanently")
            .build();

        let messages_retried = meter
            .u64_counter("herald.dispatch.messages.retried.total")
            .with_description("Total number of delivery retries scheduled")
            .build();

        let attempts_per_message = meter
            .u64_histogram("herald.dispatch.attempts")
            .with_description("Distribution of delivery attempts before success")
            .build();

        let queued = Arc::new(AtomicU64::new(0));
        let in_flight = Arc::new(AtomicU64::new(0));
        let retrying = Arc::new(AtomicU64::new(0));

        let (queued_ref, in_flight_ref, retrying_ref) =
            (queued.clone(), in_flight.clone(), retrying.clone());

        // The meter keeps this alive internally via the callback
        meter
            .u64_observable_gauge("herald.dispatch.queue.size")
            .with_description("Current number of messages by dispatch state")
            .with_callback(move |observer| {
                observer.observe(
                    queued_ref.load(Ordering::Relaxed),
                    &[KeyValue::new("state", "queued")],
                );
                observer.observe(
                    in_flight_ref.load(Ordering::Relaxed),
                    &[KeyValue::new("state", "in_flight")],
                );
                observer.observe(
                    retrying_ref.load(Ordering::Relaxed),
                    &[KeyValue::new("state", "retrying")],
                );
            })
            .build();

        Ok(Self {
            batches_total,
            batch_duration_seconds,
            messages_sent,
            messages_failed,
            messages_retried,
            attempts_per_message,
            queued,
            in_flight,
            retrying,
        })
    }

    /// Record a settled batch
    pub fn record_batch(&self, size: usize, duration_secs: f64) {
        let attributes = [KeyValue::new("size", i64::try_from(size).unwrap_or(i64::MAX))];
        self.batches_total.add(1, &[]);
        self.batch_duration_seconds.record(duration_secs, &attributes);
    }

    /// Record a successful delivery
    pub fn record_sent(&self, attempts: u32) {
        self.messages_sent.add(1, &[]);
        self.attempts_per_message.record(u64::from(attempts), &[]);
    }

    /// Record a terminal failure
    pub fn record_failed(&self, reason: &'static str) {
        self.messages_failed
            .add(1, &[KeyValue::new("reason", reason)]);
    }

    /// Record a scheduled retry
    pub fn record_retry(&self) {
        self.messages_retried.add(1, &[]);
    }

    /// Publish the current queue depth for the observable gauge
    pub fn set_queue_state(&self, queued: u64, in_flight: u64, retrying: u64) {
        self.queued.store(queued, Ordering::Relaxed);
        self.in_flight.store(in_flight, Ordering::Relaxed);
        self.retrying.store(retrying, Ordering::Relaxed);
    }

    #[must_use]
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn retrying(&self) -> u64 {
        self.retrying.load(Ordering::Relaxed)
    }
}

/// Get the OpenTelemetry meter for dispatcher metrics
fn meter() -> Meter {
    opentelemetry::global::meter("herald.dispatch")
}
