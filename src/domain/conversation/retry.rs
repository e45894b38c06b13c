use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::domain::DomainError;

/// Exponential backoff for collaborator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Maximum delay between retries
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn no_retries() -> Self {
        Self::new(0)
    }

    pub fn with_initial_delay(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn with_max_delay(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (0-indexed)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(retry as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64).max(0.0) as u64;

        Duration::from_millis(delay_ms)
    }
}

/// Result of a retried call together with the number of attempts made
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, DomainError>,
    pub attempts: u32,
}

/// Runs `call` until it succeeds, fails with a non-transient error, or the
/// policy is exhausted. Each attempt is bounded by `limit`.
pub async fn retry_with_timeout<T, F, Fut>(
    policy: &RetryPolicy,
    limit: Duration,
    operation: &str,
    call: F,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    retry_with_timeout_observed(policy, limit, operation, call, |_, _| std::future::ready(())).await
}

/// Same as [`retry_with_timeout`], awaiting `on_failure` with the 1-based
/// attempt number after every failed attempt, the last one included.
pub async fn retry_with_timeout_observed<T, F, Fut, G, GFut>(
    policy: &RetryPolicy,
    limit: Duration,
    operation: &str,
    mut call: F,
    mut on_failure: G,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
    G: FnMut(u32, &DomainError) -> GFut,
    GFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts();
    let mut last_error = DomainError::internal(format!("{} was never attempted", operation));

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = policy.delay_for_retry(attempt - 1);
            tracing::debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "Retrying");
            tokio::time::sleep(delay).await;
        }

        // the attempt future is dropped on timeout
        let outcome = match timeout(limit, call(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(operation, limit)),
        };

        let error = match outcome {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt + 1,
                };
            }
            Err(e) => e,
        };

        tracing::warn!(operation, attempt = attempt + 1, error = %error, "Attempt failed");
        on_failure(attempt + 1, &error).await;

        if !error.is_transient() {
            return Attempted {
                result: Err(error),
                attempts: attempt + 1,
            };
        }
        last_error = error;
    }

    Attempted {
        result: Err(last_error),
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_calculation() {
        let policy = RetryPolicy::new(5)
            .with_initial_delay(100)
            .with_max_delay(1000)
            .with_backoff_multiplier(2.0);

        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_retry(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 4);
        assert_eq!(RetryPolicy::no_retries().max_attempts(), 1);
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_initial_delay(1).with_max_delay(2)
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let outcome = retry_with_timeout(&fast_policy(3), Duration::from_secs(1), "op", |attempt| async move {
            if attempt < 2 {
                Err(DomainError::provider("mock", "unavailable"))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 2);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let outcome: Attempted<()> =
            retry_with_timeout(&fast_policy(2), Duration::from_secs(1), "op", |_| async {
                Err(DomainError::provider("mock", "unavailable"))
            })
            .await;

        assert!(matches!(outcome.result, Err(DomainError::Provider { .. })));
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let outcome: Attempted<()> =
            retry_with_timeout(&fast_policy(5), Duration::from_secs(1), "op", |_| async {
                Err(DomainError::validation("bad arguments"))
            })
            .await;

        assert!(matches!(outcome.result, Err(DomainError::Validation { .. })));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_attempt_is_time_boxed() {
        let outcome: Attempted<()> =
            retry_with_timeout(&fast_policy(1), Duration::from_millis(10), "generation", |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(outcome.result, Err(DomainError::Timeout { .. })));
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_failure_callback_sees_every_failed_attempt() {
        let seen = std::sync::Mutex::new(Vec::new());

        let outcome: Attempted<()> = retry_with_timeout_observed(
            &fast_policy(3),
            Duration::from_secs(1),
            "op",
            |attempt| async move {
                match attempt {
                    0 => Err(DomainError::provider("mock", "unavailable")),
                    _ => Err(DomainError::validation("bad arguments")),
                }
            },
            |attempt, error: &DomainError| {
                seen.lock().unwrap().push((attempt, error.is_transient()));
                std::future::ready(())
            },
        )
        .await;

        assert!(matches!(outcome.result, Err(DomainError::Validation { .. })));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(*seen.lock().unwrap(), vec![(1, true), (2, false)]);
    }
}
