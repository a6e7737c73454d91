use media_sync_models::{MediaKind, TraktId};
use tracing::{debug, warn};

use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;

/// Make sure show or movie details are cached locally, fetching them when
/// missing. Returns `Ok(false)` when the remote does not know the entity;
/// the caller skips the item.
pub async fn ensure_details(
    ctx: &SyncContext,
    media: MediaKind,
    trakt_id: TraktId,
) -> Result<bool, SyncError> {
    let cached = ctx.store.read(|t| t.details(media).exists(&trakt_id)).await;
    if cached {
        return Ok(true);
    }

    let fetched = cancel::remote(&ctx.cancel, ctx.remote.fetch_details(media, trakt_id)).await;

    match fetched {
        Ok(details) => {
            debug!(media = %media, trakt_id, title = %details.title, "Fetched details");
            ctx.store.write(|t| t.details_mut(media).upsert(details)).await;
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            warn!(media = %media, trakt_id, "Details not found remotely, skipping item");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
