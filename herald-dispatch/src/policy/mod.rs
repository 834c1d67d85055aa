//! Policy abstractions for dispatch operations.
//!
//! Pure decision logic, kept apart from the processor so it can be reasoned
//! about and tested without a runtime.
//!
//! - [`RetryPolicy`]: decides whether a failed attempt is retried, and when

pub mod retry;

pub use retry::{GiveUpReason, RetryDecision, RetryPolicy};
