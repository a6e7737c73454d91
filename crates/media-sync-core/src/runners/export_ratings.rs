use std::collections::HashMap;

use futures::future::try_join_all;
use media_sync_models::{RatingKind, RatingRecord, TraktId};
use media_sync_sources::{RatingRequest, RatingRequestValue, RemoteRating, RequestIds};
use tracing::{debug, info};

use super::{rate_limit, EXPORT_CHUNK_SIZE};
use crate::cancel;
use crate::context::SyncContext;
use crate::dates::format_date;
use crate::error::SyncError;
use crate::ratings::should_export;

pub(super) async fn run(ctx: &SyncContext) -> Result<usize, SyncError> {
    let repository = ctx.ratings();
    let kinds = repository.enabled_kinds();

    let mut local = Vec::with_capacity(kinds.len());
    for kind in &kinds {
        local.push((*kind, repository.load_all(*kind).await));
    }
    if local.iter().all(|(_, ratings)| ratings.is_empty()) {
        debug!("No local ratings to export");
        return Ok(0);
    }

    let remote_sets = cancel::remote(
        &ctx.cancel,
        try_join_all(kinds.iter().map(|kind| ctx.remote.fetch_ratings(*kind))),
    )
    .await?;

    let mut pending: Vec<(RatingKind, Vec<RatingRecord>)> = local
        .into_iter()
        .zip(remote_sets)
        .map(|((kind, ratings), remote)| (kind, eligible(ratings, &remote)))
        .collect();

    let mut exported = 0;
    let mut chunks = 0;
    loop {
        let request = next_chunk(&mut pending);
        if request.is_empty() {
            break;
        }
        cancel::remote(&ctx.cancel, ctx.remote.post_ratings(&request)).await?;
        exported += request.len();
        chunks += 1;
        rate_limit(ctx).await?;
    }

    info!(count = exported, chunks, "Exported ratings");
    Ok(exported)
}

/// Local ratings the remote lacks or holds an older value for.
fn eligible(local: Vec<RatingRecord>, remote: &[RemoteRating]) -> Vec<RatingRecord> {
    let by_id: HashMap<TraktId, &RemoteRating> = remote
        .iter()
        .filter_map(|r| r.trakt_id.map(|id| (id, r)))
        .collect();
    local
        .into_iter()
        .filter(|r| should_export(r.rated_at, by_id.get(&r.trakt_id).copied()))
        .collect()
}

/// Take up to one chunk of each kind off `pending` and build one request
/// spanning all of them. Returns an empty request when nothing is left.
pub fn next_chunk(pending: &mut [(RatingKind, Vec<RatingRecord>)]) -> RatingRequest {
    let mut request = RatingRequest::default();
    for (kind, ratings) in pending.iter_mut() {
        let take = ratings.len().min(EXPORT_CHUNK_SIZE);
        for rating in ratings.drain(..take) {
            request.bucket_mut(*kind).push(RatingRequestValue {
                rating: rating.rating,
                rated_at: format_date(rating.rated_at),
                ids: RequestIds { trakt: rating.trakt_id },
            });
        }
    }
    request
}
