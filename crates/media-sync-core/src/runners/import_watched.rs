use std::collections::HashSet;

use chrono::Utc;
use media_sync_models::{CollectionKind, EpisodeRecord, MediaKind, TraktId};
use media_sync_sources::{RemoteSeason, RemoteWatched};
use media_sync_store::StoreError;
use tracing::debug;

use super::{collection_record, item_status, ProgressFn};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::progress::ProgressTracker;
use crate::show_progress::{ShowProgress, WatchedMarks};

pub(super) async fn run(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    if !ctx.movies_enabled() {
        return import_shows(ctx, progress).await;
    }
    if ctx.options.concurrent_import {
        // Shows and movies touch disjoint tables
        let (shows, movies) = tokio::try_join!(import_shows(ctx, progress), import_movies(ctx, progress))?;
        return Ok(shows + movies);
    }
    let shows = import_shows(ctx, progress).await?;
    Ok(shows + import_movies(ctx, progress).await?)
}

fn marks_of(item: &RemoteWatched) -> WatchedMarks {
    WatchedMarks::remote(
        item.episodes
            .iter()
            .map(|e| (e.season_number, e.episode_number, e.watched_at)),
    )
}

async fn import_shows(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let watched = cancel::remote(&ctx.cancel, ctx.remote.fetch_watched(MediaKind::Show)).await?;

    let mut tracker = ProgressTracker::new("import_watched_shows", watched.len());
    for (idx, item) in watched.iter().enumerate() {
        cancel::check(&ctx.cancel)?;
        let show_id = item.media.trakt_id;
        let membership = ctx.store.read(|t| t.membership(MediaKind::Show, show_id)).await;

        match membership {
            Some(CollectionKind::Hidden) => tracker.record_skipped(),
            Some(CollectionKind::History) => {
                if update_existing_show(ctx, item).await? > 0 {
                    tracker.record_added();
                } else {
                    tracker.record_already_present();
                }
            }
            _ => {
                progress(&item_status("Importing", &item.media.title));
                import_new_show(ctx, item).await?;
                tracker.record_added();
            }
        }
        tracker.tick(idx + 1);
    }

    tracker.finish();
    Ok(tracker.added())
}

/// Bring a show into the watch history with its full season list.
async fn import_new_show(ctx: &SyncContext, item: &RemoteWatched) -> Result<(), SyncError> {
    let show_id = item.media.trakt_id;
    let seasons = cancel::remote(&ctx.cancel, ctx.remote.fetch_seasons(show_id)).await?;
    let watched: HashSet<(u32, u32)> = item
        .episodes
        .iter()
        .map(|w| (w.season_number, w.episode_number))
        .collect();
    remember_unresolved(ctx, show_id, watched, &seasons).await;

    let (watched_seasons, watched_episodes) = ctx
        .store
        .read(|t| (t.watched_season_ids(&[show_id]), t.watched_episode_ids(&[show_id])))
        .await;
    let progress = ShowProgress::build(&item.media, &seasons, &marks_of(item), &watched_seasons, &watched_episodes);

    let now = Utc::now();
    let watched_at = item.last_watched_at.unwrap_or(now);
    let record = collection_record(&item.media, watched_at, watched_at);
    let details = item.media.clone();

    debug!(show_id, episodes = progress.episodes.len(), "Importing new show");
    ctx.store
        .transaction(|t| {
            t.shows.upsert(details);
            progress.write(t, CollectionKind::History, record)
        })
        .await?;
    Ok(())
}

/// Mark remotely watched episodes of a show already in the history.
/// Returns the number of newly watched episodes.
async fn update_existing_show(ctx: &SyncContext, item: &RemoteWatched) -> Result<usize, SyncError> {
    let show_id = item.media.trakt_id;
    let local = ctx.store.read(|t| t.episodes_for_show(show_id)).await;

    let missing: HashSet<(u32, u32)> = item
        .episodes
        .iter()
        .filter(|w| find_episode(&local, w.season_number, w.episode_number).is_none())
        .map(|w| (w.season_number, w.episode_number))
        .collect();
    let known_gap = !missing.is_empty()
        && ctx
            .unresolved_episodes
            .lock()
            .await
            .get(&show_id)
            .is_some_and(|gap| missing.is_subset(gap));

    if known_gap {
        debug!(
            show_id,
            missing = missing.len(),
            "Watched episodes unknown to the remote season list"
        );
    } else if !missing.is_empty() {
        // New episodes aired since the show was imported
        let seasons = cancel::remote(&ctx.cancel, ctx.remote.fetch_seasons(show_id)).await?;
        remember_unresolved(ctx, show_id, missing, &seasons).await;
        let (watched_seasons, watched_episodes) = ctx
            .store
            .read(|t| (t.watched_season_ids(&[show_id]), t.watched_episode_ids(&[show_id])))
            .await;
        let progress = ShowProgress::build(&item.media, &seasons, &marks_of(item), &watched_seasons, &watched_episodes);
        let newly_watched = progress.watched_episodes();
        ctx.store
            .transaction(|t| {
                t.seasons.upsert_all(progress.seasons);
                t.episodes.upsert_all(progress.episodes);
                Ok::<_, StoreError>(())
            })
            .await?;
        return Ok(newly_watched);
    }

    let marked = ctx
        .store
        .write(|t| {
            let mut marked: Vec<TraktId> = Vec::new();
            for w in &item.episodes {
                let Some(episode) = find_episode(&local, w.season_number, w.episode_number) else {
                    continue;
                };
                if t.mark_episode_watched(episode.trakt_id, w.watched_at) {
                    marked.push(episode.trakt_id);
                }
            }
            // Remote history already has these
            for id in &marked {
                if let Some(at) = t.episodes.get(id).and_then(|e| e.last_watched_at) {
                    t.mark_episodes_exported(&[*id], at);
                }
            }
            marked.len()
        })
        .await;
    Ok(marked)
}

/// Keep the watched episodes `seasons` does not list, so the next sync does
/// not refetch the seasons for them again.
async fn remember_unresolved(
    ctx: &SyncContext,
    show_id: TraktId,
    watched: HashSet<(u32, u32)>,
    seasons: &[RemoteSeason],
) {
    let unresolved: HashSet<(u32, u32)> = watched
        .into_iter()
        .filter(|(season, number)| {
            !seasons
                .iter()
                .flat_map(|s| &s.episodes)
                .any(|e| e.season_number == *season && e.episode_number == *number)
        })
        .collect();

    let mut gaps = ctx.unresolved_episodes.lock().await;
    if unresolved.is_empty() {
        gaps.remove(&show_id);
    } else {
        gaps.insert(show_id, unresolved);
    }
}

fn find_episode(episodes: &[EpisodeRecord], season: u32, number: u32) -> Option<&EpisodeRecord> {
    episodes
        .iter()
        .find(|e| e.season_number == season && e.episode_number == number)
}

async fn import_movies(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let watched = cancel::remote(&ctx.cancel, ctx.remote.fetch_watched(MediaKind::Movie)).await?;

    let mut tracker = ProgressTracker::new("import_watched_movies", watched.len());
    for (idx, item) in watched.iter().enumerate() {
        cancel::check(&ctx.cancel)?;
        let movie_id = item.media.trakt_id;
        let membership = ctx.store.read(|t| t.membership(MediaKind::Movie, movie_id)).await;

        match membership {
            Some(CollectionKind::Hidden) | Some(CollectionKind::History) => {
                tracker.record_already_present();
            }
            _ => {
                progress(&item_status("Importing", &item.media.title));
                let watched_at = item.last_watched_at.unwrap_or_else(Utc::now);
                let record = collection_record(&item.media, watched_at, watched_at);
                let details = item.media.clone();
                ctx.store
                    .write(|t| {
                        t.movies.upsert(details);
                        t.set_membership(MediaKind::Movie, CollectionKind::History, record);
                        t.exported_movies.insert(movie_id);
                    })
                    .await;
                tracker.record_added();
            }
        }
        tracker.tick(idx + 1);
    }

    tracker.finish();
    Ok(tracker.added())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::{no_progress, SyncRunner};
    use crate::testing::{context, details, episode_id, season, season_id, FakeRemote};
    use media_sync_sources::WatchedEpisode;
    use std::sync::Arc;

    fn watched_show(id: TraktId, episodes: &[(u32, u32)]) -> RemoteWatched {
        RemoteWatched {
            media: details(id, "Show"),
            last_watched_at: Some(Utc::now()),
            episodes: episodes
                .iter()
                .map(|(s, e)| WatchedEpisode {
                    season_number: *s,
                    episode_number: *e,
                    watched_at: Some(Utc::now()),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_imports_new_show_with_progress() {
        let remote = FakeRemote::default().with_seasons(1, &[2, 2]);
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1), (1, 2), (2, 1)])]);
        let ctx = context(Arc::new(remote));

        let count = SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();

        assert_eq!(count, 1);
        ctx.store
            .read(|t| {
                assert!(t.my_shows.exists(&1));
                assert!(t.shows.exists(&1));
                assert!(t.seasons.get(&season_id(1, 1)).unwrap().is_watched);
                assert!(!t.seasons.get(&season_id(1, 2)).unwrap().is_watched);
                assert!(t.episodes.get(&episode_id(1, 2, 1)).unwrap().is_watched);
                assert!(!t.episodes.get(&episode_id(1, 2, 2)).unwrap().is_watched);
                assert!(t.pending_episode_exports().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_existing_show_is_only_marked() {
        let remote = Arc::new(FakeRemote::default().with_seasons(1, &[2]));
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1)])]);
        let ctx = context(remote.clone());

        SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1), (1, 2)])]);
        let count = SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(remote.calls("fetch_seasons"), 1);
        let season_watched = ctx.store.read(|t| t.seasons.get(&season_id(1, 1)).unwrap().is_watched).await;
        assert!(season_watched);
    }

    #[tokio::test]
    async fn test_episode_missing_remotely_is_fetched_once() {
        let remote = Arc::new(FakeRemote::default().with_seasons(1, &[2]));
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1), (1, 3)])]);
        let ctx = context(remote.clone());

        SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();
        SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();
        SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();

        assert_eq!(remote.calls("fetch_seasons"), 1);
        let episode = ctx.store.read(|t| t.episodes.get(&episode_id(1, 1, 1)).cloned()).await;
        assert!(episode.unwrap().is_watched);

        // A newly aired episode still triggers a refetch
        remote.seasons.lock().unwrap().insert(1, vec![season(1, 1, 2), season(1, 2, 1)]);
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1), (1, 3), (2, 1)])]);
        let count = SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(remote.calls("fetch_seasons"), 2);
        let episode = ctx.store.read(|t| t.episodes.get(&episode_id(1, 2, 1)).cloned()).await;
        assert!(episode.unwrap().is_watched);
    }

    #[tokio::test]
    async fn test_hidden_show_is_skipped() {
        let remote = Arc::new(FakeRemote::default().with_seasons(1, &[1]));
        remote
            .watched
            .lock()
            .unwrap()
            .insert(MediaKind::Show, vec![watched_show(1, &[(1, 1)])]);
        let ctx = context(remote.clone());
        ctx.store
            .write(|t| {
                t.set_membership(
                    MediaKind::Show,
                    CollectionKind::Hidden,
                    collection_record(&details(1, "Show"), Utc::now(), Utc::now()),
                )
            })
            .await;

        let count = SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(remote.calls("fetch_seasons"), 0);
    }

    #[tokio::test]
    async fn test_movies_move_from_watchlist_to_history() {
        let remote = FakeRemote::default();
        remote.watched.lock().unwrap().insert(
            MediaKind::Movie,
            vec![RemoteWatched {
                media: details(5, "Movie"),
                last_watched_at: None,
                episodes: Vec::new(),
            }],
        );
        let ctx = context(Arc::new(remote));
        ctx.store
            .write(|t| {
                t.set_membership(
                    MediaKind::Movie,
                    CollectionKind::Watchlist,
                    collection_record(&details(5, "Movie"), Utc::now(), Utc::now()),
                )
            })
            .await;

        assert_eq!(SyncRunner::ImportWatched.run(&ctx, &no_progress).await.unwrap(), 1);
        let (kind, pending) = ctx
            .store
            .read(|t| (t.membership(MediaKind::Movie, 5), t.pending_movie_exports().len()))
            .await;
        assert_eq!(kind, Some(CollectionKind::History));
        assert_eq!(pending, 0);
    }
}
