use chrono::Utc;
use futures::future::try_join_all;
use media_sync_models::{CollectionKind, MediaKind};

use super::{collection_record, item_status, ProgressFn};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::progress::ProgressTracker;

pub(super) async fn run(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let kinds = MediaKind::ALL
        .into_iter()
        .filter(|media| *media != MediaKind::Movie || ctx.movies_enabled());

    if ctx.options.concurrent_import {
        let counts = try_join_all(kinds.map(|media| import_kind(ctx, media, progress))).await?;
        return Ok(counts.into_iter().sum());
    }

    let mut count = 0;
    for media in kinds {
        count += import_kind(ctx, media, progress).await?;
    }
    Ok(count)
}

async fn import_kind(
    ctx: &SyncContext,
    media: MediaKind,
    progress: ProgressFn<'_>,
) -> Result<usize, SyncError> {
    let watchlist = cancel::remote(&ctx.cancel, ctx.remote.fetch_watchlist(media)).await?;

    let mut tracker = ProgressTracker::new("import_watchlist", watchlist.len());
    for (idx, item) in watchlist.into_iter().enumerate() {
        cancel::check(&ctx.cancel)?;
        let trakt_id = item.media.trakt_id;

        // Anything already collected, watched or hidden, wins over the watchlist
        let collected = ctx.store.read(|t| t.membership(media, trakt_id).is_some()).await;
        if collected {
            tracker.record_already_present();
            tracker.tick(idx + 1);
            continue;
        }

        progress(&item_status("Importing", &item.media.title));
        let listed_at = item.listed_at.unwrap_or_else(Utc::now);
        let record = collection_record(&item.media, listed_at, listed_at);
        ctx.store
            .write(|t| {
                if !t.details(media).exists(&trakt_id) {
                    t.details_mut(media).upsert(item.media);
                }
                t.set_membership(media, CollectionKind::Watchlist, record);
            })
            .await;
        tracker.record_added();
        tracker.tick(idx + 1);
    }

    tracker.finish();
    Ok(tracker.added())
}
