//! Bounded retry with a fixed delay

use std::future::Future;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use tracing::{error, info};

use crate::error::{BuildError, Result};

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_secs(2 * 60) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Every failure is logged. After the last one the error is wrapped in
    /// [`BuildError::MaxRetriesExceeded`].
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut schedule = Constant::new(self.backoff);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            "Operation '{}' succeeded after {} attempts",
                            operation_name, attempt
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    error!(
                        "Operation '{}' failed (attempt {}/{}): {}",
                        operation_name, attempt, self.max_attempts, e
                    );

                    if attempt >= self.max_attempts {
                        return Err(BuildError::MaxRetriesExceeded {
                            operation: operation_name.to_string(),
                            max_attempts: self.max_attempts,
                            source: Box::new(e),
                        });
                    }

                    let delay = schedule.next_backoff().unwrap_or(self.backoff);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_successful_operation_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = quick_policy(3)
            .run("test", move || {
                let counter = Arc::clone(&counter_clone);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_with_eventual_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = quick_policy(3)
            .run("test", move || {
                let counter = Arc::clone(&counter_clone);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(BuildError::tool_failed("dupload", "exit status: 1"))
                    } else {
                        Ok("uploaded")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "uploaded");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<()> = quick_policy(3)
            .run("dupload", move || {
                let counter = Arc::clone(&counter_clone);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(BuildError::tool_failed("dupload", "exit status: 1"))
                }
            })
            .await;

        match result.unwrap_err() {
            BuildError::MaxRetriesExceeded { operation, max_attempts, source } => {
                assert_eq!(operation, "dupload");
                assert_eq!(max_attempts, 3);
                assert!(matches!(*source, BuildError::ToolFailed { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let start = tokio::time::Instant::now();

        let result: Result<()> = RetryPolicy::default()
            .run("dupload", || async { Err(BuildError::tool_failed("dupload", "exit status: 1")) })
            .await;

        assert!(result.is_err());
        // Three attempts, two waits of two minutes each.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4 * 60));
        assert!(elapsed < Duration::from_secs(4 * 60 + 1));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(120));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
