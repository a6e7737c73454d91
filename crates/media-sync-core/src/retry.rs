use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cancel;
use crate::error::SyncError;

/// Run `op` and retry transient failures up to `max_retries` times, waiting
/// `delay` between attempts. At most `max_retries + 1` calls are made.
/// Cancellation and non-transient errors are returned immediately.
pub async fn with_retry<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    delay: Duration,
    token: &CancellationToken,
    mut op: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut attempt: u32 = 0;
    loop {
        cancel::check(token)?;
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if error.is_cancelled() || !error.is_retryable() || attempt >= max_retries {
            return Err(error);
        }

        attempt += 1;
        warn!(
            operation,
            attempt,
            max_retries,
            delay_ms = delay.as_millis() as u64,
            "{} failed: {}. Will retry",
            operation,
            error
        );
        cancel::sleep(token, delay).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_sync_sources::SourceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> SyncError {
        SourceError::Network("connection reset".to_string()).into()
    }

    #[tokio::test]
    async fn test_retry_ceiling_is_respected() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: Result<(), SyncError> = with_retry("test", 3, Duration::ZERO, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let value = with_retry("test", 5, Duration::ZERO, &token, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: Result<(), SyncError> = with_retry("test", 5, Duration::ZERO, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Unauthorized("expired".to_string()).into()) }
        })
        .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retrying() {
        let calls = AtomicU32::new(0);
        let token = CancellationToken::new();

        let result: Result<(), SyncError> = with_retry("test", 5, Duration::ZERO, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            token.cancel();
            async { Err(transient()) }
        })
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
