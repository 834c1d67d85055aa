use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use herald_common::{Message, outgoing};
use herald_dispatch::{DeliveryError, Receipt, Transport};

/// A transport that logs each message and reports it delivered.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    delivered: AtomicU64,
}

impl DryRunTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn deliver(&self, message: &Message) -> Result<Receipt, DeliveryError> {
        let n = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        outgoing!(
            level = INFO,
            "[dry-run] {} to {}: {}",
            message.kind,
            message.recipient,
            message.content
        );

        Ok(Receipt::new(format!("dry-run-{n}")))
    }
}
