//! Retry-with-backoff combinator for remote calls.
//!
//! Every stage wraps its call in [`with_backoff`] instead of hand-rolling a
//! loop at the call site. Only rate-limit failures are retried; everything
//! else propagates immediately.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::AppraiseError;

/// Attempt budget and backoff base for one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (1-based) failed:
    /// base, 2x base, 4x base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << (attempt - 1).min(16))
    }
}

/// Run `op`, retrying on rate limits with exponential backoff.
///
/// A non-rate-limit error returns at once. Spending the whole budget on
/// rate limits returns [`AppraiseError::Exhausted`].
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, AppraiseError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppraiseError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() => {
                if attempt >= policy.max_attempts {
                    return Err(AppraiseError::Exhausted {
                        attempts: policy.max_attempts,
                    });
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 10,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 2_000,
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_rate_limits() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result = with_backoff(fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppraiseError::RateLimited)
                } else {
                    Ok("appraised")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "appraised");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Waited roughly base + 2x base between attempts.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn persistent_rate_limit_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppraiseError::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(AppraiseError::Exhausted { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppraiseError::Network("connection reset".into())) }
        })
        .await;

        assert!(matches!(result, Err(AppraiseError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
