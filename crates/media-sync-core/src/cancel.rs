//! Cooperative cancellation at suspension points.

use std::future::Future;
use std::time::Duration;
use media_sync_sources::SourceError;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// Fail fast when the token is already cancelled.
pub fn check(token: &CancellationToken) -> Result<(), SyncError> {
    if token.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

/// Run `fut` until it completes or the token is cancelled, whichever comes first.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}

/// A remote call that gives up as soon as the token is cancelled.
pub async fn remote<T, F>(token: &CancellationToken, call: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        result = call => result.map_err(SyncError::from),
    }
}

/// Sleep that wakes up early with `Cancelled`.
pub async fn sleep(token: &CancellationToken, duration: Duration) -> Result<(), SyncError> {
    if duration.is_zero() {
        return check(token);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
