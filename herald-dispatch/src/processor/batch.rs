//! Batch processing
//!
//! A batch delivers all of its items concurrently, waits for every outcome,
//! records the batch in the metrics, and only then resolves completions or
//! hands failures to the retry scheduler.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{task::JoinSet, time::Instant};
use tracing::debug;

use super::{Shared, retry};
use crate::{
    DeliveryError, GiveUpReason, Receipt, SystemError, metrics::BatchReport, queue::QueueItem,
};

/// Releases the batch's concurrency slot and wakes the loop when dropped,
/// whether the batch settled, panicked or was cancelled.
pub(super) struct InFlightGuard {
    shared: Arc<Shared>,
}

impl InFlightGuard {
    pub(super) const fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            self.shared.publish(&state);
        }

        self.shared.wake.notify_one();
    }
}

enum Resolution {
    Deliver(QueueItem, Receipt),
    Retry(QueueItem, DeliveryError, Duration),
    Finalise(QueueItem, DeliveryError, GiveUpReason),
    Abandon(QueueItem, DeliveryError),
}

pub(super) async fn process(
    shared: Arc<Shared>,
    batch_id: u64,
    mut items: Vec<QueueItem>,
    _guard: InFlightGuard,
) {
    let started = Instant::now();
    let outcomes = deliver_all(&shared, &mut items).await;
    settle(&shared, batch_id, items, outcomes, started.elapsed());
}

/// Run one delivery task per item and collect the outcomes in item order.
async fn deliver_all(
    shared: &Shared,
    items: &mut [QueueItem],
) -> Vec<Result<Receipt, DeliveryError>> {
    let mut tasks = JoinSet::new();
    let mut positions = HashMap::with_capacity(items.len());

    for (position, item) in items.iter_mut().enumerate() {
        item.start_attempt();

        let transport = Arc::clone(&shared.transport);
        let message = Arc::clone(&item.message);
        let handle = tasks.spawn(async move { transport.deliver(&message).await });
        positions.insert(handle.id(), position);
    }

    let mut outcomes: Vec<Option<Result<Receipt, DeliveryError>>> =
        std::iter::repeat_with(|| None).take(items.len()).collect();

    while let Some(joined) = tasks.join_next_with_id().await {
        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(err) => {
                let task_id = err.id();
                (
                    task_id,
                    Err(SystemError::DeliveryPanicked(err.to_string()).into()),
                )
            }
        };

        if let Some(slot) = positions
            .get(&task_id)
            .and_then(|&position| outcomes.get_mut(position))
        {
            *slot = Some(outcome);
        }
    }

    outcomes
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|| {
                Err(SystemError::BatchInfrastructure(
                    "no outcome was observed for this delivery".to_string(),
                )
                .into())
            })
        })
        .collect()
}

fn settle(
    shared: &Arc<Shared>,
    batch_id: u64,
    items: Vec<QueueItem>,
    outcomes: Vec<Result<Receipt, DeliveryError>>,
    duration: Duration,
) {
    let mut report = BatchReport {
        attempted: items.len(),
        duration,
        ..BatchReport::default()
    };

    let resolutions: Vec<Resolution> = items
        .into_iter()
        .zip(outcomes)
        .map(|(item, outcome)| match outcome {
            Ok(receipt) => {
                report.succeeded += 1;
                Resolution::Deliver(item, receipt)
            }
            Err(error) => match retry::route(shared, &item, &error) {
                retry::Route::Retry { delay } => {
                    report.retried += 1;
                    Resolution::Retry(item, error, delay)
                }
                retry::Route::Finalise { reason } => {
                    report.failed += 1;
                    Resolution::Finalise(item, error, reason)
                }
                retry::Route::Abandon => {
                    report.failed += 1;
                    Resolution::Abandon(item, error)
                }
            },
        })
        .collect();

    // Before any completion resolves, so a woken caller sees itself counted
    shared.metrics.record_batch(&report);
    if let Some(telemetry) = shared.telemetry {
        telemetry.record_batch(report.attempted, duration.as_secs_f64());
    }

    debug!(
        batch_id,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        retried = report.retried,
        duration_ms = duration.as_millis(),
        "Batch settled"
    );

    for resolution in resolutions {
        match resolution {
            Resolution::Deliver(item, receipt) => {
                if let Some(telemetry) = shared.telemetry {
                    telemetry.record_sent(item.attempts);
                }
                item.succeed(receipt);
            }
            Resolution::Retry(item, error, delay) => retry::schedule(shared, item, error, delay),
            Resolution::Finalise(item, error, reason) => retry::finalise(shared, item, error, reason),
            Resolution::Abandon(mut item, error) => {
                item.last_error = Some(error);
                retry::resolve_abandoned(shared, item);
            }
        }
    }
}
