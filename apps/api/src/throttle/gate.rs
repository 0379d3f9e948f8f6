use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use super::rate_limiter::RateLimiter;
use super::retry::{Retryable, RetryPolicy};

/// Rate limiter + retry policy wrapped around every call to one external service.
#[derive(Debug)]
pub struct ServiceGate {
    service: &'static str,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ServiceGate {
    pub fn new(service: &'static str, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            service,
            limiter,
            retry,
        }
    }

    /// Runs `op` through the limiter, repeating it on transient errors until
    /// the policy's attempts run out. Non-transient errors return immediately.
    pub async fn call<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            self.limiter.acquire().await;

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{} call attempt {}/{} failed: {} (retrying after {}ms)",
                        self.service,
                        attempt,
                        self.retry.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::throttle::retry::Backoff;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient={})", self.transient)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn gate(max_attempts: u32) -> ServiceGate {
        ServiceGate::new(
            "test",
            RateLimiter::with_interval(Duration::ZERO),
            RetryPolicy::new(max_attempts, Duration::from_secs(2), Backoff::Fixed),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, TestError> = gate(3)
            .call(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TestError { transient: true })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), TestError> = gate(3)
            .call(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError { transient: true })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), TestError> = gate(3)
            .call(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError { transient: false })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
