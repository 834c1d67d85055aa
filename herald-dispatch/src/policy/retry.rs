//! Retry policy for dispatch operations.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DeliveryError};

/// Retry policy configuration.
///
/// The delay before the retry that follows attempt `k` is
/// `base_delay_ms * 2^(k - 1)`, optionally capped by `max_delay_ms` and
/// randomised by `jitter_factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of delivery attempts before giving up, including the first.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff (in milliseconds).
    ///
    /// Default: 1000
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for the computed backoff (in milliseconds).
    ///
    /// Default: uncapped
    #[serde(default)]
    pub max_delay_ms: Option<u64>,

    /// Jitter factor for randomizing retry delays, within ±`jitter_factor`.
    ///
    /// Default: 0.0
    #[serde(default)]
    pub jitter_factor: f64,

    /// Whether permanent failures are retried like any other.
    ///
    /// When `false` a [`DeliveryError::Permanent`] is final on the attempt
    /// that produced it.
    ///
    /// Default: true
    #[serde(default = "defaults::retry_permanent")]
    pub retry_permanent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_ms: defaults::base_delay_ms(),
            max_delay_ms: None,
            jitter_factor: 0.0,
            retry_permanent: defaults::retry_permanent(),
        }
    }
}

/// What to do with an item whose latest attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue the item once `delay` has elapsed.
    Retry { delay: Duration },
    /// Finalise the item with its last error.
    GiveUp { reason: GiveUpReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// `max_attempts` reached
    Exhausted,
    /// Permanent failure while `retry_permanent` is off
    NonRetryable,
}

impl GiveUpReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::NonRetryable => "rejected",
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the policy can be applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroAttempts`] when no attempt would ever be
    /// made, or [`ConfigError::InvalidJitter`] for a jitter factor outside
    /// `0.0..=1.0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitter(self.jitter_factor));
        }

        Ok(())
    }

    /// Check if another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Get the number of remaining attempts.
    #[must_use]
    pub const fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }

    /// Backoff after `attempts` attempts, before jitter.
    ///
    /// Attempt 1 waits the base delay, attempt 2 twice that, and so on.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1);
        let delay = if exponent >= 63 {
            u64::MAX
        } else {
            self.base_delay_ms.saturating_mul(1u64 << exponent)
        };

        let delay = self.max_delay_ms.map_or(delay, |cap| delay.min(cap));
        Duration::from_millis(delay)
    }

    /// Backoff after `attempts` attempts with jitter applied.
    #[must_use]
    pub fn jittered_delay_for(&self, attempts: u32) -> Duration {
        let delay = self.delay_for(attempts);
        if self.jitter_factor <= 0.0 {
            return delay;
        }

        let millis = delay.as_secs_f64() * 1000.0;
        let range = millis * self.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "The jittered delay is clamped to be non-negative, and sub-millisecond precision is irrelevant"
        )]
        let jittered = (millis + jitter).max(0.0) as u64;

        Duration::from_millis(jittered)
    }

    /// Decide what happens to an item whose `attempts`-th attempt failed with `error`.
    #[must_use]
    pub fn decide(&self, attempts: u32, error: &DeliveryError) -> RetryDecision {
        if error.is_permanent() && !self.retry_permanent {
            return RetryDecision::GiveUp {
                reason: GiveUpReason::NonRetryable,
            };
        }

        if !self.should_retry(attempts) {
            return RetryDecision::GiveUp {
                reason: GiveUpReason::Exhausted,
            };
        }

        RetryDecision::Retry {
            delay: self.jittered_delay_for(attempts),
        }
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn base_delay_ms() -> u64 {
        1000
    }

    pub const fn retry_permanent() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PermanentError, SystemError, TemporaryError};

    fn temporary() -> DeliveryError {
        TemporaryError::ServerError("503".into()).into()
    }

    fn permanent() -> DeliveryError {
        PermanentError::InvalidRecipient("123".into()).into()
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, None);
        assert!(policy.jitter_factor.abs() < f64::EPSILON);
        assert!(policy.retry_permanent);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));

        assert_eq!(policy.remaining_attempts(1), 2);
        assert_eq!(policy.remaining_attempts(5), 0);
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(512_000));

        // Attempt 0 never happens in practice, treat it like the first
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_cap_and_overflow() {
        let policy = RetryPolicy {
            max_delay_ms: Some(5000),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(64), Duration::from_millis(5000));

        let uncapped = RetryPolicy::default();
        assert_eq!(uncapped.delay_for(100), Duration::from_millis(u64::MAX));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Calls an unsupported method")]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            jitter_factor: 0.2,
            ..RetryPolicy::default()
        };

        for _ in 0..100 {
            let delay = policy.jittered_delay_for(2).as_millis();
            assert!((1600..=2400).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_decide_retries_until_exhausted() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(1, &temporary()),
            RetryDecision::Retry {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            policy.decide(2, &permanent()),
            RetryDecision::Retry {
                delay: Duration::from_millis(2000)
            }
        );
        assert_eq!(
            policy.decide(3, &SystemError::Internal("x".into()).into()),
            RetryDecision::GiveUp {
                reason: GiveUpReason::Exhausted
            }
        );
    }

    #[test]
    fn test_decide_short_circuits_permanent_errors() {
        let policy = RetryPolicy {
            retry_permanent: false,
            ..RetryPolicy::default()
        };

        assert_eq!(
            policy.decide(1, &permanent()),
            RetryDecision::GiveUp {
                reason: GiveUpReason::NonRetryable
            }
        );
        assert!(matches!(
            policy.decide(1, &temporary()),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn test_validate() {
        assert_eq!(RetryPolicy::default().validate(), Ok(()));

        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.validate(), Err(ConfigError::ZeroAttempts));

        let policy = RetryPolicy {
            jitter_factor: 1.5,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.validate(), Err(ConfigError::InvalidJitter(1.5)));

        let policy = RetryPolicy {
            jitter_factor: f64::NAN,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
