use media_sync_models::{CollectionKind, MediaKind};
use media_sync_sources::{SyncItem, SyncItemsRequest};
use tracing::{debug, info};

use super::{rate_limit, EXPORT_CHUNK_SIZE};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;

/// Push the local watchlist. The remote ignores items it already holds.
pub(super) async fn run(ctx: &SyncContext) -> Result<usize, SyncError> {
    let mut exported = 0;
    for media in MediaKind::ALL {
        if media == MediaKind::Movie && !ctx.movies_enabled() {
            continue;
        }

        let watchlist = ctx
            .store
            .read(|t| t.collection(media, CollectionKind::Watchlist).get_all())
            .await;
        if watchlist.is_empty() {
            debug!(media = %media, "Watchlist empty, nothing to export");
            continue;
        }

        for chunk in watchlist.chunks(EXPORT_CHUNK_SIZE) {
            let mut request = SyncItemsRequest::default();
            for record in chunk {
                request.push_media(media, SyncItem::new(record.trakt_id));
            }
            cancel::remote(&ctx.cancel, ctx.remote.post_watchlist(&request)).await?;
            exported += chunk.len();
            rate_limit(ctx).await?;
        }
        info!(media = %media, count = watchlist.len(), "Exported watchlist");
    }
    Ok(exported)
}
