use chrono::Utc;
use media_sync_models::TraktId;
use media_sync_sources::{SyncItem, SyncItemsRequest};
use tracing::{debug, info};

use super::{rate_limit, EXPORT_CHUNK_SIZE};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;

/// Push watched episodes and movies the remote history does not have yet.
pub(super) async fn run(ctx: &SyncContext) -> Result<usize, SyncError> {
    let movies_enabled = ctx.movies_enabled();
    let (episodes, movies) = ctx
        .store
        .read(|t| {
            let movies = if movies_enabled {
                t.pending_movie_exports()
            } else {
                Vec::new()
            };
            (t.pending_episode_exports(), movies)
        })
        .await;

    if episodes.is_empty() && movies.is_empty() {
        debug!("No watched history to export");
        return Ok(0);
    }

    let mut exported = 0;
    for chunk in episodes.chunks(EXPORT_CHUNK_SIZE) {
        let mut request = SyncItemsRequest::default();
        for episode in chunk {
            let item = SyncItem::new(episode.trakt_id);
            request.episodes.push(match episode.last_watched_at {
                Some(at) => item.watched_at(at),
                None => item,
            });
        }
        cancel::remote(&ctx.cancel, ctx.remote.post_history(&request)).await?;

        let ids: Vec<TraktId> = chunk.iter().map(|e| e.trakt_id).collect();
        let now = Utc::now();
        ctx.store.write(|t| t.mark_episodes_exported(&ids, now)).await;
        exported += chunk.len();
        rate_limit(ctx).await?;
    }

    for chunk in movies.chunks(EXPORT_CHUNK_SIZE) {
        let mut request = SyncItemsRequest::default();
        request.movies = chunk
            .iter()
            .map(|m| SyncItem::new(m.trakt_id).watched_at(m.updated_at))
            .collect();
        cancel::remote(&ctx.cancel, ctx.remote.post_history(&request)).await?;

        ctx.store
            .write(|t| t.exported_movies.extend(chunk.iter().map(|m| m.trakt_id)))
            .await;
        exported += chunk.len();
        rate_limit(ctx).await?;
    }

    info!(episodes = episodes.len(), movies = movies.len(), "Exported watched history");
    Ok(exported)
}

#[cfg(test)]
mod tests {
    use crate::runners::{collection_record, no_progress, SyncRunner};
    use crate::testing::{context, details, FakeRemote};
    use chrono::Utc;
    use media_sync_models::{CollectionKind, EpisodeRecord, MediaKind};
    use std::sync::Arc;

    fn watched_episode(id: i64) -> EpisodeRecord {
        EpisodeRecord {
            trakt_id: id,
            season_trakt_id: 1,
            show_trakt_id: 1,
            show_tmdb_id: 10,
            season_number: 1,
            episode_number: id as u32,
            is_watched: true,
            last_watched_at: Some(Utc::now()),
            last_exported_at: None,
        }
    }

    #[tokio::test]
    async fn test_exports_pending_once() {
        let remote = Arc::new(FakeRemote::default());
        let ctx = context(remote.clone());
        ctx.store
            .write(|t| {
                t.episodes.upsert_all((1..=250).map(watched_episode));
                t.set_membership(
                    MediaKind::Movie,
                    CollectionKind::History,
                    collection_record(&details(7, "Movie"), Utc::now(), Utc::now()),
                );
            })
            .await;

        assert_eq!(SyncRunner::ExportWatched.run(&ctx, &no_progress).await.unwrap(), 251);
        assert_eq!(remote.posted_history.lock().unwrap().len(), 3);

        assert_eq!(SyncRunner::ExportWatched.run(&ctx, &no_progress).await.unwrap(), 0);
        assert_eq!(remote.calls("post_history"), 3);
    }
}
