//! Typed error handling for dispatch operations.
//!
//! Transports report a [`DeliveryError`] per attempt, classified as:
//! - Permanent failures (rejected by the remote API) - retried only when the policy allows
//! - Temporary failures (network, rate limiting, 5xx) - retried with backoff
//! - System errors - internal problems, including panicking deliveries
//!
//! Callers only ever see a [`DispatchError`], the terminal outcome of an item.

use std::time::Duration;

use thiserror::Error;

/// Outcome of a single failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Failure the remote API will keep returning for this message.
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Failure that may clear up by itself.
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// Internal error that is not the remote API's fault.
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Permanent errors reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermanentError {
    /// Recipient was rejected by the remote API.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Message was rejected (bad payload, policy violation, ...).
    #[error("Message rejected: {0}")]
    MessageRejected(String),

    /// Credentials were refused.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The transport cannot carry this kind of message.
    #[error("Unsupported message: {0}")]
    Unsupported(String),
}

/// Temporary errors that should be retried with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporaryError {
    /// Failed to reach the remote API.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Remote API returned a server-side failure.
    #[error("Server error: {0}")]
    ServerError(String),
}

/// System-level errors that indicate internal problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    /// The delivery task panicked.
    #[error("Delivery panicked: {0}")]
    DeliveryPanicked(String),

    /// The batch never observed an outcome for this item.
    #[error("Batch infrastructure failure: {0}")]
    BatchInfrastructure(String),

    /// The remote API answered with something the transport could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Other internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    /// Returns `true` if this error is temporary.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns `true` if this error is permanent.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Short label used as a metric attribute.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Permanent(_) => "permanent",
            Self::Temporary(_) => "temporary",
            Self::System(_) => "system",
        }
    }
}

/// Terminal failure of a dispatched item, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Every allowed attempt failed.
    #[error("Delivery failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        source: DeliveryError,
    },

    /// A permanent failure ended delivery before the attempts ran out.
    #[error("Delivery rejected after {attempts} attempt(s): {source}")]
    Rejected {
        attempts: u32,
        source: DeliveryError,
    },

    /// The dispatcher was shut down with [`ShutdownMode::Abandon`](crate::ShutdownMode::Abandon)
    /// before the item reached a terminal state.
    #[error("Delivery abandoned during shutdown after {attempts} attempt(s)")]
    Abandoned {
        attempts: u32,
        last_error: Option<DeliveryError>,
    },

    /// The dispatcher no longer accepts new messages.
    #[error("Dispatcher is shutting down")]
    ShuttingDown,

    /// The item was dropped without being resolved, which only happens
    /// when the runtime is torn down underneath the dispatcher.
    #[error("Dispatch outcome was lost")]
    Dropped,

    /// Shutdown did not finish in time.
    #[error("Shutdown did not complete within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },
}

impl DispatchError {
    /// Number of delivery attempts made before the item was finalised,
    /// when the item got that far.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Abandoned { attempts, .. } => Some(*attempts),
            Self::ShuttingDown | Self::Dropped | Self::ShutdownTimeout { .. } => None,
        }
    }

    /// The last delivery error observed for the item, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&DeliveryError> {
        match self {
            Self::Exhausted { source, .. } | Self::Rejected { source, .. } => Some(source),
            Self::Abandoned { last_error, .. } => last_error.as_ref(),
            Self::ShuttingDown | Self::Dropped | Self::ShutdownTimeout { .. } => None,
        }
    }
}

/// Invalid [`DispatchConfig`](crate::DispatchConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("concurrency_limit must be greater than zero")]
    ZeroConcurrency,

    #[error("retry.max_attempts must be at least one")]
    ZeroAttempts,

    #[error("retry.jitter_factor must be between 0.0 and 1.0, got {0}")]
    InvalidJitter(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let temp: DeliveryError = TemporaryError::RateLimited("slow down".into()).into();
        assert!(temp.is_temporary());
        assert!(!temp.is_permanent());
        assert_eq!(temp.category(), "temporary");

        let perm: DeliveryError = PermanentError::InvalidRecipient("123".into()).into();
        assert!(perm.is_permanent());
        assert_eq!(perm.category(), "permanent");

        let sys: DeliveryError = SystemError::DeliveryPanicked("boom".into()).into();
        assert!(sys.is_system());
        assert_eq!(sys.category(), "system");
    }

    #[test]
    fn test_dispatch_error_carries_attempts_and_source() {
        let source: DeliveryError = TemporaryError::Timeout("30s".into()).into();
        let err = DispatchError::Exhausted {
            attempts: 3,
            source: source.clone(),
        };

        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.last_error(), Some(&source));
        assert_eq!(
            err.to_string(),
            "Delivery failed after 3 attempt(s): Temporary failure: Request timed out: 30s"
        );

        assert_eq!(DispatchError::ShuttingDown.attempts(), None);
        assert_eq!(
            DispatchError::Abandoned {
                attempts: 0,
                last_error: None
            }
            .last_error(),
            None
        );
    }
}
