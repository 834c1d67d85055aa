//! The dispatch loop
//!
//! Pulls batches off the queue while fewer than `concurrency_limit` are in
//! flight, and exits once the queue is empty and every batch has settled.
//! Enqueues, requeues and settling batches wake it through [`Notify`](tokio::sync::Notify).

use std::sync::Arc;

use herald_common::internal;
use tracing::debug;

use super::{LoopState, Shared, batch, retry};
use crate::queue::QueueItem;

enum Step {
    Dispatch { batch_id: u64, items: Vec<QueueItem> },
    Wait,
    Abandon(Vec<QueueItem>),
    Exit,
}

pub(super) async fn run(shared: Arc<Shared>) {
    internal!("Dispatch loop started");

    loop {
        match next_step(&shared) {
            Step::Dispatch { batch_id, items } => {
                debug!(batch_id, size = items.len(), "Dispatching batch");
                let guard = batch::InFlightGuard::new(Arc::clone(&shared));
                shared
                    .tracker
                    .spawn(batch::process(Arc::clone(&shared), batch_id, items, guard));
            }
            Step::Wait => {
                tokio::select! {
                    () = shared.wake.notified() => {}
                    () = shared.cancel.cancelled() => {}
                }
            }
            Step::Abandon(items) => {
                if !items.is_empty() {
                    debug!(count = items.len(), "Abandoning queued items");
                }

                for item in items {
                    retry::abandon(&shared, item);
                }
                break;
            }
            Step::Exit => break,
        }
    }

    internal!("Dispatch loop completed");
}

/// Make the next decision under the state lock.
///
/// Deciding to exit and marking the loop `Completed` happen in the same
/// critical section as every enqueue, so an item pushed concurrently either
/// lands before the check or starts a fresh loop.
fn next_step(shared: &Shared) -> Step {
    let mut state = shared.state.lock();

    if shared.cancel.is_cancelled() {
        state.loop_state = LoopState::Completed;
        let items = state.queue.take_all();
        shared.publish(&state);
        return Step::Abandon(items);
    }

    if state.in_flight >= shared.config.concurrency_limit {
        return Step::Wait;
    }

    let items = state.queue.drain(shared.config.batch_size);
    if items.is_empty() {
        if state.in_flight == 0 {
            state.loop_state = LoopState::Completed;
            return Step::Exit;
        }

        return Step::Wait;
    }

    state.in_flight += 1;
    state.next_batch_id += 1;
    let batch_id = state.next_batch_id;
    shared.publish(&state);

    Step::Dispatch { batch_id, items }
}
