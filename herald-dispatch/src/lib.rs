//! Bulk dispatch engine for outbound messages
//!
//! This crate provides functionality to:
//! - Queue outbound messages, each with a completion handle for its outcome
//! - Drain the queue in fixed-size batches under a global concurrency ceiling
//! - Retry failed deliveries with exponential backoff
//! - Aggregate throughput and failure metrics
//!
//! The remote API is reached only through the [`Transport`] trait.

mod config;
mod error;
mod metrics;
pub mod policy;
mod processor;
mod queue;
mod transport;
mod types;

pub use config::DispatchConfig;
pub use error::{ConfigError, DeliveryError, DispatchError, PermanentError, SystemError, TemporaryError};
pub use metrics::{BatchReport, DispatchTotals, MetricsAggregator, MetricsSnapshot};
pub use policy::{GiveUpReason, RetryDecision, RetryPolicy};
pub use processor::{Dispatcher, LoopState};
pub use queue::Completion;
pub use transport::{Receipt, Transport};
pub use types::{BulkReport, Delivered, Outcome, ShutdownMode};
