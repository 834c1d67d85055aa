use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use herald_common::Message;
use tokio::{sync::oneshot, time::Instant};

use crate::{Delivered, DeliveryError, DispatchError, Outcome, Receipt};

/// One pending or in-retry send request.
///
/// Consuming the item is the only way to resolve its completion, so every
/// item resolves at most once. Dropping an unresolved item resolves the
/// caller's [`Completion`] with [`DispatchError::Dropped`].
#[derive(Debug)]
pub(crate) struct QueueItem {
    pub(crate) id: u64,
    pub(crate) message: Arc<Message>,
    pub(crate) attempts: u32,
    pub(crate) enqueued_at: Instant,
    pub(crate) last_error: Option<DeliveryError>,
    completion: oneshot::Sender<Outcome>,
}

impl QueueItem {
    pub(crate) fn new(id: u64, message: Arc<Message>) -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        let item = Self {
            id,
            message,
            attempts: 0,
            enqueued_at: Instant::now(),
            last_error: None,
            completion: sender,
        };

        (item, Completion { id, receiver })
    }

    pub(crate) const fn start_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub(crate) fn succeed(self, receipt: Receipt) {
        let delivered = Delivered {
            receipt,
            attempts: self.attempts,
            latency: self.enqueued_at.elapsed(),
        };

        // The caller may have stopped waiting, which is fine
        let _ = self.completion.send(Ok(delivered));
    }

    pub(crate) fn fail(self, error: DispatchError) {
        let _ = self.completion.send(Err(error));
    }
}

/// Handle to the eventual outcome of a sent message.
///
/// Resolves exactly once, when the message is delivered or reaches a
/// terminal failure. Dropping it does not cancel the send.
#[derive(Debug)]
#[must_use = "a Completion does nothing unless awaited, the message is sent either way"]
pub struct Completion {
    id: u64,
    receiver: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// A handle that is already resolved with `error`.
    pub(crate) fn failed(id: u64, error: DispatchError) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(Err(error));
        Self { id, receiver }
    }

    /// Dispatcher-assigned sequence number, as it appears in logs.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DispatchError::Dropped)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herald_common::Recipient;

    use super::*;

    fn message() -> Arc<Message> {
        Arc::new(Message::text(Recipient::parse("919876543210").unwrap(), "hi"))
    }

    #[tokio::test]
    async fn completion_resolves_with_delivery() {
        let (mut item, completion) = QueueItem::new(7, message());
        assert_eq!(completion.id(), 7);

        item.start_attempt();
        item.start_attempt();
        item.succeed(Receipt::new("wamid.7"));

        let delivered = completion.await.unwrap();
        assert_eq!(delivered.attempts, 2);
        assert_eq!(delivered.receipt.id.as_deref(), Some("wamid.7"));
    }

    #[tokio::test]
    async fn dropped_item_resolves_as_dropped() {
        let (item, completion) = QueueItem::new(1, message());
        drop(item);

        assert_eq!(completion.await, Err(DispatchError::Dropped));
    }

    #[tokio::test]
    async fn pre_failed_completion() {
        let completion = Completion::failed(3, DispatchError::ShuttingDown);
        assert_eq!(completion.await, Err(DispatchError::ShuttingDown));
    }
}
