//! Retry logic with exponential backoff
//!
//! Only the conformance harness retries. Tool handlers make one attempt and
//! report whatever happened.

use std::time::Duration;
use tokio::time::sleep;

/// Retry an async operation with exponential backoff
///
/// # Arguments
/// * `operation` - The operation to retry (must be FnMut to allow mutation)
/// * `max_attempts` - Maximum number of attempts (including first try)
/// * `initial_delay` - Initial delay before first retry
///
/// # Returns
/// * `Ok(T)` if operation succeeds within max_attempts
/// * `Err(E)` if all attempts fail
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    max_attempts: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff_if(operation, max_attempts, initial_delay, |_| true).await
}

/// Like [`retry_with_backoff`], but gives up immediately on errors for which
/// `is_transient` returns false
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    mut operation: F,
    max_attempts: u32,
    initial_delay: Duration,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && is_transient(&e) => {
                tracing::warn!(
                    "Attempt {}/{} failed: {}, retrying after {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                delay *= 2; // Exponential backoff
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::error!("All {} attempts failed. Last error: {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_with_backoff(
            || async { Ok::<_, String>(42) },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result = retry_with_backoff(
            || {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err("Temporary failure")
                    } else {
                        Ok(42)
                    }
                }
            },
            5,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_fails_all_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result = retry_with_backoff(
            || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("Permanent failure")
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result = retry_with_backoff_if(
            || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("400 bad request")
                }
            },
            5,
            Duration::from_millis(10),
            |e: &&str| e.starts_with("503"),
        )
        .await;

        assert_eq!(result, Err("400 bad request"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
