//! Retry with exponential backoff for transient node failures.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::domain::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self {
            max_retries: runtime.max_retries,
            backoff_base: Duration::from_millis(runtime.backoff_base_ms),
        }
    }

    /// Delay after the given 1-based failed attempt: `base * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

/// Outcome of [`retry_transient`].
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, PipelineError>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Run `op` until it succeeds, fails permanently or exhausts the policy.
///
/// Only errors with [`PipelineError::is_transient`] are retried. The cancel
/// token is checked before each backoff sleep; `on_retry` runs before it.
pub async fn retry_transient<T, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
    mut on_retry: R,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
    R: FnMut(u32, &PipelineError),
{
    let max_attempts = policy.max_retries.saturating_add(1);
    let mut attempt = 1;
    loop {
        let err = match op().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(err) => err,
        };
        if !err.is_transient() || attempt >= max_attempts {
            return Attempted {
                result: Err(err),
                attempts: attempt,
            };
        }
        if cancel.is_cancelled() {
            return Attempted {
                result: Err(PipelineError::Cancelled),
                attempts: attempt,
            };
        }
        on_retry(attempt, &err);
        tokio::time::sleep(policy.backoff(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{FetchError, ScoringError, ValidationError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base: Duration::from_millis(100),
        }
    }

    fn transient() -> PipelineError {
        FetchError::Timeout {
            source_name: "requirements".to_string(),
            timeout_ms: 10,
        }
        .into()
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(3);
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_from_runtime_defaults() {
        let p = RetryPolicy::from_runtime(&RuntimeConfig::default());
        assert_eq!(p.max_retries, 2);
        assert_eq!(p.backoff_base, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_exhausts_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let mut retried = Vec::new();
        let out: Attempted<()> = retry_transient(
            &policy(2),
            &CancellationToken::new(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            },
            |attempt, _| retried.push(attempt),
        )
        .await;
        assert_eq!(out.attempts, 3);
        assert_eq!(out.retries(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retried, vec![1, 2]);
        assert!(out.result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out = retry_transient(
            &policy(2),
            &CancellationToken::new(),
            move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(PipelineError::from(ScoringError::Backend("503".to_string())))
                } else {
                    Ok(n)
                }
            },
            |_, _| {},
        )
        .await;
        assert_eq!(out.result.unwrap(), 1);
        assert_eq!(out.attempts, 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out: Attempted<()> = retry_transient(
            &policy(5),
            &CancellationToken::new(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::from(ValidationError::Malformed(
                    "bad".to_string(),
                )))
            },
            |_, _| {},
        )
        .await;
        assert_eq!(out.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_retry_count_does_not_overflow() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out = retry_transient(
            &policy(u32::MAX),
            &CancellationToken::new(),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(transient())
                } else {
                    Ok(())
                }
            },
            |_, _| {},
        )
        .await;
        assert!(out.result.is_ok());
        assert_eq!(out.attempts, 4);
    }

    #[tokio::test]
    async fn test_cancel_stops_retrying() {
        let token = CancellationToken::new();
        token.cancel();
        let out: Attempted<()> =
            retry_transient(&policy(5), &token, || async { Err(transient()) }, |_, _| {}).await;
        assert_eq!(out.attempts, 1);
        assert!(matches!(out.result, Err(PipelineError::Cancelled)));
    }
}
