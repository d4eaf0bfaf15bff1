//! Bounded retry with exponential backoff for a single outbound call,
//! built on `tokio-retry`'s `ExponentialBackoff`.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn exponential(max_attempts: usize) -> Self {
        Self { max_attempts, base_delay: Duration::from_millis(50) }
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.base_delay.as_millis().max(1) as u64)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Run `f` under the policy's backoff schedule, retrying while `should_retry`
/// returns `true` for the error. Stops early on the first success or on the
/// first error `should_retry` rejects.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
    f: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    let mut delays = policy.strategy();
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) {
                    return Err(err);
                }
                last_err = Some(err);
                match delays.next() {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(last_err.unwrap()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_ok() {
        let policy = RetryPolicy::exponential(3);
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(
            &policy,
            |_| true,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            },
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_exhausted() {
        let policy = RetryPolicy::exponential(3);
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(
            &policy,
            |_| true,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom")
            },
        )
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_early_when_not_retryable() {
        let policy = RetryPolicy::exponential(5);
        let calls = AtomicUsize::new(0);
        let result: Result<u32, &str> = with_retry(
            &policy,
            |_| false,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
