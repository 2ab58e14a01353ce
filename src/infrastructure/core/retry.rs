//! Bounded retry with exponential backoff for classified upstream calls.

use crate::domain::errors::UpstreamError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// The upstream contract: up to 2 retries, base 10s, capped at 30s.
    pub fn upstream_default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Same attempt budget with no sleeping, for tests and mocks.
    pub fn immediate() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        if exp.is_zero() {
            return exp;
        }
        // Up to 10% jitter so parallel sessions do not thunder in step
        let jitter = rand::rng().random_range(0.0..0.1);
        exp.mul_f64(1.0 + jitter)
    }
}

/// Run `operation`, retrying transient failures per `policy`. Permanent
/// failures, unknown tickers and closed markets surface immediately.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    op_name: &str,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{}: transient failure (attempt {}/{}), retrying in {:?}: {}",
                    op_name,
                    attempt + 1,
                    policy.max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&RetryPolicy::immediate(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(UpstreamError::Transient("503".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_exhausts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryPolicy::immediate(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(UpstreamError::Transient("503".to_string())) }
        })
        .await;
        assert!(result.is_err());
        // 1 initial + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryPolicy::immediate(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(UpstreamError::Permanent("401".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
