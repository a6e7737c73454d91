//! One-directional sync passes between the local store and the remote service.

mod export_lists;
mod export_ratings;
mod export_watched;
mod export_watchlist;
mod import_lists;
mod import_ratings;
mod import_watched;
mod import_watchlist;

use std::fmt;

use chrono::{DateTime, Utc};
use media_sync_models::{CollectionRecord, MediaDetails};
use tracing::{debug, info};

use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::retry::with_retry;

pub use export_ratings::next_chunk;

/// Items per remote POST.
pub const EXPORT_CHUNK_SIZE: usize = 200;

/// Receives a human-readable line per processed item.
pub type ProgressFn<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Progress callback that drops every update.
pub fn no_progress(_: &str) {}

pub(crate) fn item_status(verb: &str, title: &str) -> String {
    format!("{}:\n\n\"{}\"...", verb, title)
}

pub(crate) fn collection_record(
    media: &MediaDetails,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> CollectionRecord {
    CollectionRecord {
        trakt_id: media.trakt_id,
        tmdb_id: media.tmdb_id,
        title: media.title.clone(),
        created_at,
        updated_at,
    }
}

/// Pause between export chunks.
pub(crate) async fn rate_limit(ctx: &SyncContext) -> Result<(), SyncError> {
    cancel::sleep(&ctx.cancel, ctx.retry().rate_limit_delay()).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncRunner {
    ImportWatched,
    ImportWatchlist,
    ImportLists,
    ImportRatings,
    ExportWatched,
    ExportWatchlist,
    ExportLists,
    ExportRatings,
}

impl SyncRunner {
    pub const IMPORT: [SyncRunner; 4] = [
        SyncRunner::ImportWatched,
        SyncRunner::ImportWatchlist,
        SyncRunner::ImportLists,
        SyncRunner::ImportRatings,
    ];

    pub const EXPORT: [SyncRunner; 4] = [
        SyncRunner::ExportWatched,
        SyncRunner::ExportWatchlist,
        SyncRunner::ExportLists,
        SyncRunner::ExportRatings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SyncRunner::ImportWatched => "import_watched",
            SyncRunner::ImportWatchlist => "import_watchlist",
            SyncRunner::ImportLists => "import_lists",
            SyncRunner::ImportRatings => "import_ratings",
            SyncRunner::ExportWatched => "export_watched",
            SyncRunner::ExportWatchlist => "export_watchlist",
            SyncRunner::ExportLists => "export_lists",
            SyncRunner::ExportRatings => "export_ratings",
        }
    }

    /// Status line shown while the runner is active.
    pub fn status(&self) -> &'static str {
        match self {
            SyncRunner::ImportWatched => "Importing progress...",
            SyncRunner::ImportWatchlist => "Importing watchlist...",
            SyncRunner::ImportLists => "Importing custom lists...",
            SyncRunner::ImportRatings => "Importing ratings...",
            SyncRunner::ExportWatched => "Exporting progress...",
            SyncRunner::ExportWatchlist => "Exporting watchlist...",
            SyncRunner::ExportLists => "Exporting custom lists...",
            SyncRunner::ExportRatings => "Exporting ratings...",
        }
    }

    pub fn is_import(&self) -> bool {
        Self::IMPORT.contains(self)
    }

    fn max_retries(&self, ctx: &SyncContext) -> u32 {
        if self.is_import() {
            ctx.retry().max_import_retries
        } else {
            ctx.retry().max_export_retries
        }
    }

    /// Run the pass, retrying transient failures. Returns the number of
    /// affected items.
    pub async fn run(
        &self,
        ctx: &SyncContext,
        progress: ProgressFn<'_>,
    ) -> Result<usize, SyncError> {
        let started = std::time::Instant::now();
        debug!(runner = self.name(), "Runner started");

        let count = with_retry(
            self.name(),
            self.max_retries(ctx),
            ctx.retry().retry_delay(),
            &ctx.cancel,
            || self.run_once(ctx, progress),
        )
        .await?;

        info!(
            runner = self.name(),
            count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} finished",
            self
        );
        Ok(count)
    }

    async fn run_once(
        &self,
        ctx: &SyncContext,
        progress: ProgressFn<'_>,
    ) -> Result<usize, SyncError> {
        match self {
            SyncRunner::ImportWatched => import_watched::run(ctx, progress).await,
            SyncRunner::ImportWatchlist => import_watchlist::run(ctx, progress).await,
            SyncRunner::ImportLists => import_lists::run(ctx, progress).await,
            SyncRunner::ImportRatings => import_ratings::run(ctx).await,
            SyncRunner::ExportWatched => export_watched::run(ctx).await,
            SyncRunner::ExportWatchlist => export_watchlist::run(ctx).await,
            SyncRunner::ExportLists => export_lists::run(ctx, progress).await,
            SyncRunner::ExportRatings => export_ratings::run(ctx).await,
        }
    }
}

impl fmt::Display for SyncRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Push pending watched history and list changes. Returns the number of
/// exported items.
pub async fn quick_sync(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let watched = SyncRunner::ExportWatched.run(ctx, progress).await?;
    let lists = SyncRunner::ExportLists.run(ctx, progress).await?;
    Ok(watched + lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, FakeRemote};
    use media_sync_sources::SourceError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_runner_retry_ceiling() {
        let remote = FakeRemote::default();
        remote.fail("fetch_watchlist", SourceError::Network("reset".to_string()));
        let remote = Arc::new(remote);
        let ctx = context(remote.clone());

        let error = SyncRunner::ImportWatchlist.run(&ctx, &no_progress).await.unwrap_err();

        assert!(error.is_retryable());
        // First kind fails on every attempt: one call plus max_import_retries
        assert_eq!(remote.calls("fetch_watchlist") as u32, ctx.retry().max_import_retries + 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let remote = FakeRemote::default();
        remote.fail("fetch_lists", SourceError::Http { status: 502, message: "gateway".to_string() });
        let remote = Arc::new(remote);
        let ctx = context(remote.clone());

        SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap_err();
        assert_eq!(remote.calls("fetch_lists") as u32, ctx.retry().max_import_retries + 1);
    }

    #[tokio::test]
    async fn test_account_limits_are_not_retried() {
        let remote = FakeRemote::default();
        remote.fail("post_watchlist", SourceError::AccountLimits("watchlist".to_string()));
        let remote = Arc::new(remote);
        let ctx = context(remote.clone());
        ctx.store
            .write(|t| {
                t.set_membership(
                    media_sync_models::MediaKind::Show,
                    media_sync_models::CollectionKind::Watchlist,
                    collection_record(&crate::testing::details(1, "Show"), Utc::now(), Utc::now()),
                )
            })
            .await;

        let error = SyncRunner::ExportWatchlist.run(&ctx, &no_progress).await.unwrap_err();
        assert!(error.is_account_limits());
        assert_eq!(remote.calls("post_watchlist"), 1);
    }

    #[test]
    fn test_item_status() {
        assert_eq!(item_status("Importing", "Dark"), "Importing:\n\n\"Dark\"...");
        assert!(SyncRunner::ImportRatings.is_import());
        assert!(!SyncRunner::ExportRatings.is_import());
    }
}
