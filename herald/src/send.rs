//! Drive a parsed CSV through the dispatcher

use std::future::Future;

use futures_util::future::join_all;
use herald_common::internal;
use herald_dispatch::{Dispatcher, ShutdownMode};
use tracing::{info, warn};

use crate::{report::RowResult, rows::Entry};

/// Send every valid entry and collect one result per entry, in row order.
///
/// When `interrupt` completes first, outstanding messages are abandoned and
/// reported as failed. Either way the dispatcher is shut down on return.
pub async fn send_all<F>(dispatcher: &Dispatcher, entries: &[Entry], interrupt: F) -> Vec<RowResult>
where
    F: Future<Output = ()>,
{
    let mut results: Vec<Option<RowResult>> = entries.iter().map(RowResult::rejected).collect();

    let (positions, completions): (Vec<_>, Vec<_>) = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let message = entry.parsed.as_ref().ok()?;
            Some((index, dispatcher.send(message.clone())))
        })
        .unzip();

    let invalid = entries.len() - positions.len();
    if invalid > 0 {
        warn!(invalid, "Skipping rows that failed validation");
    }
    info!(messages = positions.len(), "Messages enqueued");

    let pending = join_all(completions);
    tokio::pin!(pending);
    tokio::pin!(interrupt);

    let outcomes = tokio::select! {
        outcomes = &mut pending => {
            internal!(level = DEBUG, "All messages resolved, draining");
            dispatcher.shutdown(ShutdownMode::Drain).await;
            outcomes
        }
        () = &mut interrupt => {
            warn!("Interrupted, abandoning outstanding messages");
            dispatcher.shutdown(ShutdownMode::Abandon).await;
            pending.await
        }
    };

    for (index, outcome) in positions.into_iter().zip(outcomes) {
        results[index] = Some(RowResult::dispatched(&entries[index], &outcome));
    }

    results.into_iter().flatten().collect()
}
