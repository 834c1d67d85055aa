//! Retry scheduling and terminal failure handling

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use super::Shared;
use crate::{DeliveryError, DispatchError, GiveUpReason, RetryDecision, queue::QueueItem};

pub(super) enum Route {
    Retry { delay: Duration },
    Finalise { reason: GiveUpReason },
    Abandon,
}

/// Where a failed item goes next.
///
/// Once an abandoning shutdown has started, nothing is rescheduled.
pub(super) fn route(shared: &Shared, item: &QueueItem, error: &DeliveryError) -> Route {
    match shared.config.retry.decide(item.attempts, error) {
        RetryDecision::Retry { .. } if shared.cancel.is_cancelled() => Route::Abandon,
        RetryDecision::Retry { delay } => Route::Retry { delay },
        RetryDecision::GiveUp { reason } => Route::Finalise { reason },
    }
}

/// Requeue `item` at the tail once `delay` has elapsed.
///
/// The timer is tracked by the dispatcher and cancelled by an abandoning
/// shutdown, in which case the item is finalised as abandoned instead.
pub(super) fn schedule(shared: &Arc<Shared>, mut item: QueueItem, error: DeliveryError, delay: Duration) {
    let remaining = shared.config.retry.remaining_attempts(item.attempts);
    if error.is_system() {
        warn!(
            item_id = item.id,
            attempts = item.attempts,
            remaining,
            delay_ms = delay.as_millis(),
            error = %error,
            "Delivery failed inside the dispatcher, scheduling retry"
        );
    } else {
        debug!(
            item_id = item.id,
            attempts = item.attempts,
            remaining,
            delay_ms = delay.as_millis(),
            error = %error,
            "Delivery failed, scheduling retry"
        );
    }

    item.last_error = Some(error);

    {
        let mut state = shared.state.lock();
        state.pending_retries += 1;
        shared.publish(&state);
    }

    if let Some(telemetry) = shared.telemetry {
        telemetry.record_retry();
    }

    let shared = Arc::clone(shared);
    let tracker = shared.tracker.clone();
    tracker.spawn(async move {
        let fired = tokio::select! {
            biased;
            () = shared.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        };

        if fired {
            shared.requeue(item);
        } else {
            {
                let mut state = shared.state.lock();
                state.pending_retries = state.pending_retries.saturating_sub(1);
                shared.publish(&state);
            }
            abandon(&shared, item);
        }
    });
}

/// Resolve `item` with its terminal error.
pub(super) fn finalise(shared: &Shared, item: QueueItem, error: DeliveryError, reason: GiveUpReason) {
    warn!(
        item_id = item.id,
        recipient = %item.message.recipient,
        attempts = item.attempts,
        error = %error,
        "Delivery failed permanently ({})",
        reason.as_str()
    );

    if let Some(telemetry) = shared.telemetry {
        telemetry.record_failed(reason.as_str());
    }

    let attempts = item.attempts;
    let error = match reason {
        GiveUpReason::Exhausted => DispatchError::Exhausted {
            attempts,
            source: error,
        },
        GiveUpReason::NonRetryable => DispatchError::Rejected {
            attempts,
            source: error,
        },
    };

    item.fail(error);
}

/// Count and resolve an item that never reached a batch report.
pub(super) fn abandon(shared: &Shared, item: QueueItem) {
    shared.metrics.record_abandoned(1);
    resolve_abandoned(shared, item);
}

/// Resolve an item as abandoned; the caller has already counted it.
pub(super) fn resolve_abandoned(shared: &Shared, mut item: QueueItem) {
    warn!(
        item_id = item.id,
        recipient = %item.message.recipient,
        attempts = item.attempts,
        "Delivery abandoned during shutdown"
    );

    if let Some(telemetry) = shared.telemetry {
        telemetry.record_failed("abandoned");
    }

    let attempts = item.attempts;
    let last_error = item.last_error.take();
    item.fail(DispatchError::Abandoned {
        attempts,
        last_error,
    });
}
