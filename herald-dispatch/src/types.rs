//! Value types handed back to callers.

use std::time::Duration;

use serde::Serialize;

use crate::{DispatchError, Receipt};

/// Successful terminal outcome of a dispatched message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivered {
    pub receipt: Receipt,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Time from first enqueue to the successful response
    pub latency: Duration,
}

/// Terminal outcome of a dispatched message.
pub type Outcome = Result<Delivered, DispatchError>;

/// How [`Dispatcher::shutdown`](crate::Dispatcher::shutdown) treats unfinished work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Finish everything, including pending retries.
    #[default]
    Drain,
    /// Finalise queued items and pending retries as [`DispatchError::Abandoned`],
    /// and let in-flight batches settle without rescheduling.
    Abandon,
}

/// Outcomes of a bulk send, in the order the messages were given.
#[derive(Debug)]
pub struct BulkReport {
    outcomes: Vec<Outcome>,
}

impl BulkReport {
    pub(crate) const fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of messages delivered.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    /// Number of messages that reached a terminal failure.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(Result::is_ok)
    }

    /// Failures with the position of the message that produced them.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &DispatchError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.as_ref().err().map(|err| (index, err)))
    }
}
