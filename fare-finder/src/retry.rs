//! Retry with exponential backoff for fare and rate lookups.
//!
//! Fare sources fail transiently: malformed payloads, missing fields and
//! dropped connections are all worth another try. Each failure is mapped to
//! [`Classification::Retryable`] or [`Classification::Fatal`] by the policy's
//! classifier; retryable failures are retried with a doubling delay until the
//! attempt budget is spent.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::fares::FareError;

const MAX_ATTEMPTS: u32 = 7;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(70);

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Fatal,
}

/// Default classifier.
///
/// Connectivity, payload and server-side failures are retryable. Rejected
/// credentials and other client errors are fatal, as is an already
/// exhausted retry.
pub fn classify(error: &FareError) -> Classification {
    match error {
        FareError::Http(e) if e.is_builder() => Classification::Fatal,
        FareError::Http(e) => match e.status() {
            Some(status) if status.is_client_error() && status.as_u16() != 429 => {
                Classification::Fatal
            }
            _ => Classification::Retryable,
        },
        FareError::Json { .. }
        | FareError::MissingField { .. }
        | FareError::Malformed { .. }
        | FareError::RateLimited
        | FareError::Unavailable(_) => Classification::Retryable,
        FareError::Api { status, .. } if *status >= 500 || *status == 408 => {
            Classification::Retryable
        }
        FareError::Api { .. } | FareError::Unauthorized | FareError::Exhausted { .. } => {
            Classification::Fatal
        }
        FareError::Shared(inner) => classify(inner),
    }
}

/// Resilience policy wrapped around every fare-source call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,

    /// Upper bound on a single backoff delay.
    pub max_delay: Duration,

    /// Fixed pause before every attempt, to stay under source-side rate
    /// limits. Added on top of any backoff.
    pub call_delay: Option<Duration>,

    /// Maps a failure to retryable or fatal.
    pub classifier: fn(&FareError) -> Classification,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
            call_delay: None,
            classifier: classify,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_classifier(mut self, classifier: fn(&FareError) -> Classification) -> Self {
        self.classifier = classifier;
        self
    }

    /// Backoff before retry number `retry` (0-indexed): base * 2^retry, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails fatally, or runs out of attempts.
    ///
    /// `operation` names the call in logs and in the exhaustion error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, FareError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FareError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if let Some(delay) = self.call_delay {
                tokio::time::sleep(delay).await;
            }

            attempt += 1;
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if (self.classifier)(&error) == Classification::Fatal {
                return Err(error);
            }

            if attempt >= max_attempts {
                return Err(FareError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.backoff(attempt - 1);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying after error: {}",
                error
            );
            tokio::time::sleep(delay).await;
        }
    }
}
