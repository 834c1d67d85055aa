//! Aggregate dispatch metrics

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Summary of one settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items handed to the transport
    pub attempted: usize,
    /// Items delivered
    pub succeeded: usize,
    /// Items that reached a terminal failure
    pub failed: usize,
    /// Items scheduled for another attempt
    pub retried: usize,
    /// Wall-clock time from the first delivery to the last outcome
    pub duration: Duration,
}

/// Monotonic counters accumulated over the dispatcher's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchTotals {
    /// Messages delivered
    pub total_sent: u64,
    /// Messages that reached a terminal failure, abandoned ones included
    pub total_failed: u64,
    /// Batches settled
    pub total_batches: u64,
    /// Retries scheduled
    pub total_retries: u64,
    /// Running mean batch duration, weighted by successful deliveries
    pub average_batch_duration_ms: f64,
}

/// Point-in-time view of the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub totals: DispatchTotals,
    /// Items waiting for a batch
    pub queue_length: usize,
    /// Batches currently being delivered
    pub in_flight_batches: usize,
    /// Items waiting for their retry timer
    pub pending_retries: usize,
}

impl MetricsSnapshot {
    /// Items that reached a terminal state.
    #[must_use]
    pub const fn resolved(&self) -> u64 {
        self.totals.total_sent + self.totals.total_failed
    }

    /// Items still owned by the dispatcher.
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.queue_length + self.pending_retries
    }
}

/// Thread-safe accumulator for [`DispatchTotals`].
///
/// Concurrent batches merge their reports under a single short lock.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    totals: Mutex<DispatchTotals>,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a settled batch into the totals.
    ///
    /// The batch duration moves the average only when the batch delivered
    /// something, weighted by the number of deliveries:
    /// `avg = (avg * sent_before + duration_ms) / sent_after`.
    #[allow(
        clippy::cast_precision_loss,
        reason = "Message counts stay far below 2^52"
    )]
    pub fn record_batch(&self, report: &BatchReport) {
        let mut totals = self.totals.lock();

        totals.total_batches += 1;
        totals.total_retries += report.retried as u64;
        totals.total_failed += report.failed as u64;

        if report.succeeded > 0 {
            let sent_before = totals.total_sent;
            totals.total_sent += report.succeeded as u64;

            let duration_ms = report.duration.as_secs_f64() * 1000.0;
            totals.average_batch_duration_ms = totals
                .average_batch_duration_ms
                .mul_add(sent_before as f64, duration_ms)
                / totals.total_sent as f64;
        }
    }

    /// Count items finalised without a batch, at shutdown.
    pub fn record_abandoned(&self, count: u64) {
        self.totals.lock().total_failed += count;
    }

    /// Copy of the current totals.
    #[must_use]
    pub fn totals(&self) -> DispatchTotals {
        *self.totals.lock()
    }
}
