use serde::{Deserialize, Serialize};

use crate::{ConfigError, RetryPolicy};

/// Dispatcher configuration, fixed for the dispatcher's lifetime.
///
/// ```ron
/// (
///     batch_size: 10,
///     concurrency_limit: 5,
///     retry: (
///         max_attempts: 3,
///         base_delay_ms: 1000,
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of items pulled from the queue per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of batches in flight at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    #[serde(default)]
    pub retry: RetryPolicy,
}

const fn default_batch_size() -> usize {
    10
}

const fn default_concurrency_limit() -> usize {
    5
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency_limit: default_concurrency_limit(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatchConfig {
    /// Check every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        self.retry.validate()
    }

    /// Upper bound on deliveries in flight at once.
    #[must_use]
    pub const fn max_parallel_deliveries(&self) -> usize {
        self.batch_size.saturating_mul(self.concurrency_limit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.max_parallel_deliveries(), 50);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_ron_uses_defaults() {
        let config: DispatchConfig = ron::from_str("(batch_size: 25, retry: (max_attempts: 5))").unwrap();

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.concurrency_limit, 5);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.retry.retry_permanent);
    }

    #[test]
    fn rejects_zero_limits() {
        let config = DispatchConfig {
            batch_size: 0,
            ..DispatchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));

        let config = DispatchConfig {
            concurrency_limit: 0,
            ..DispatchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));

        let config = DispatchConfig {
            retry: RetryPolicy {
                max_attempts: 0,
                ..RetryPolicy::default()
            },
            ..DispatchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }
}
