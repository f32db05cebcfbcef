//! Retry logic with exponential backoff for transient HTTP failures.
//!
//! Transport failures during page fetches are classified into a
//! [`FailureType`]; the [`RetryPolicy`] decides whether to retry and how long
//! to back off, adding jitter so retries do not synchronize.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tracing::debug;

/// Default maximum attempts (including the initial attempt).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of an HTTP failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection refused, 5xx, 429.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404, malformed response body.
    Permanent,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the request.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Classifies an HTTP status code.
#[must_use]
pub fn classify_status(status: StatusCode) -> FailureType {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        FailureType::Transient
    } else {
        FailureType::Permanent
    }
}

/// Classifies a reqwest transport error.
///
/// Timeouts and connect failures are transient; body/decode failures mean
/// the response itself was malformed and retrying will not help.
#[must_use]
pub fn classify_transport_error(error: &reqwest::Error) -> FailureType {
    if error.is_timeout() || error.is_connect() {
        FailureType::Transient
    } else if error.is_decode() || error.is_body() {
        FailureType::Permanent
    } else {
        FailureType::Transient
    }
}

/// Configuration for retry behavior with exponential backoff.
///
/// Delays follow `min(base_delay * multiplier^attempt, max_delay) + jitter`;
/// with defaults that is approximately 1s, 2s before attempts run out.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom attempt bound and default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Returns the configured attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether a failed attempt should be retried.
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    #[must_use]
    pub fn should_retry(&self, failure: FailureType, attempt: u32) -> RetryDecision {
        if failure == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) reached", self.max_attempts),
            };
        }

        let delay = self.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "will retry");
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Computes the backoff delay for a given (1-indexed) failed attempt.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.backoff_multiplier.powi(exponent.min(16) as i32);
        let base_ms = self.base_delay.as_millis() as f32;
        let capped_ms = (base_ms * multiplier).min(self.max_delay.as_millis() as f32);

        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(capped_ms as u64) + Duration::from_millis(jitter_ms)
    }
}
