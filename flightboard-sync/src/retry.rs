//! Reusable retry policy for transport calls.
//!
//! One policy is parameterized by attempt budget, backoff function and a
//! retryability predicate (the [`Retryable`] trait). Server wait hints win
//! over the computed backoff, capped at the backoff maximum.

use flightboard_core::{RetryConfig, TransportError};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

// ============================================================================
// PREDICATE
// ============================================================================

/// Distinguishes failures worth another attempt from final ones.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Server-provided wait before the next attempt.
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        TransportError::is_retryable(self)
    }

    fn retry_hint(&self) -> Option<Duration> {
        TransportError::retry_hint(self)
    }
}

// ============================================================================
// BACKOFF
// ============================================================================

/// Delay between attempts when the server gives no hint.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        multiplier: f32,
        max: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = initial.as_secs_f64() * f64::from(*multiplier).powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }

    /// Upper bound of any delay this backoff produces.
    pub fn max(&self) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { max, .. } => *max,
        }
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// A non-retryable error; returned on the attempt that produced it.
    Fatal(E),
    /// Every attempt failed with a retryable error.
    Exhausted {
        operation: String,
        attempts: u32,
        last: E,
    },
}

impl<E> RetryFailure<E> {
    /// The error from the final attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryFailure::Fatal(e) => e,
            RetryFailure::Exhausted { last, .. } => last,
        }
    }
}

impl From<RetryFailure<TransportError>> for TransportError {
    fn from(failure: RetryFailure<TransportError>) -> Self {
        match failure {
            RetryFailure::Fatal(e) => e,
            RetryFailure::Exhausted {
                operation,
                attempts,
                last,
            } => TransportError::RetriesExhausted {
                operation,
                attempts,
                last_error: last.to_string(),
            },
        }
    }
}

/// Bounded retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` counts the first call and is at least 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Exponential backoff from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Backoff::Exponential {
                initial: config.initial_backoff,
                multiplier: config.backoff_multiplier,
                max: config.max_backoff,
            },
        )
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry`. A server hint is honored but
    /// never exceeds the backoff maximum.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.backoff.max()),
            None => self.backoff.delay(retry),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget runs out.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(RetryFailure::Fatal(err)),
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!(
                        operation,
                        attempts = attempt,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(RetryFailure::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt, err.retry_hint());
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
