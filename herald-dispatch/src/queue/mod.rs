//! Pending send requests

mod item;

use std::collections::VecDeque;

pub use item::Completion;
pub(crate) use item::QueueItem;

/// FIFO buffer of items waiting for a batch.
///
/// Not synchronised by itself; it lives inside the dispatcher's state lock.
#[derive(Debug, Default)]
pub(crate) struct Queue {
    items: VecDeque<QueueItem>,
}

impl Queue {
    /// Append an item at the tail, fresh or retried alike.
    pub(crate) fn push(&mut self, item: QueueItem) {
        self.items.push_back(item);
    }

    /// Remove up to `max` items from the front.
    pub(crate) fn drain(&mut self, max: usize) -> Vec<QueueItem> {
        let count = max.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// Remove everything.
    pub(crate) fn take_all(&mut self) -> Vec<QueueItem> {
        self.items.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
