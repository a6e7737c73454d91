//! Restore of a backup document into the local store.
//!
//! Import only ever adds: entities already collected, episodes already
//! watched and ratings already present locally are left as they are, so
//! importing the same file twice changes nothing the second time.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::Utc;
use media_sync_models::{
    BackupEpisode, BackupList, BackupLists, BackupMovie, BackupMovies, BackupScheme, BackupShow,
    BackupShows, CollectionKind, CollectionRecord, CustomList, MediaDetails, MediaKind, RatingKind,
    RatingRecord, TraktId,
};
use media_sync_store::{Keyed, StoreError};
use tracing::{debug, info, warn};

use super::parse::parse_backup;
use crate::cancel;
use crate::context::SyncContext;
use crate::dates::{parse_date, parse_date_or_now};
use crate::details::ensure_details;
use crate::error::SyncError;
use crate::ratings::MAX_RATING;
use crate::show_progress::{ShowProgress, WatchedMarks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    Idle,
    Initializing,
    Importing(String),
}

/// Receives status changes while an import runs.
pub type StatusListener<'a> = &'a (dyn Fn(ImportStatus) + Send + Sync);

enum ItemOutcome {
    Added,
    Present, // already collected locally
    Unknown, // gone from the remote
}

/// What an import added.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub shows: usize,
    pub movies: usize,
    pub episodes: usize,
    pub ratings: usize,
    pub lists: usize,
    pub list_items: usize,
    pub skipped: usize,
}

pub struct BackupImporter {
    ctx: SyncContext,
}

impl BackupImporter {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Parse and import a backup file's contents. A malformed file fails
    /// before anything is written.
    pub async fn import_json(
        &self,
        json: &str,
        listener: StatusListener<'_>,
    ) -> Result<ImportSummary, SyncError> {
        listener(ImportStatus::Initializing);
        match parse_backup(json) {
            Ok(scheme) => self.run(scheme, listener).await,
            Err(e) => {
                listener(ImportStatus::Idle);
                Err(e)
            }
        }
    }

    pub async fn import(
        &self,
        scheme: BackupScheme,
        listener: StatusListener<'_>,
    ) -> Result<ImportSummary, SyncError> {
        listener(ImportStatus::Initializing);
        self.run(scheme, listener).await
    }

    async fn run(
        &self,
        scheme: BackupScheme,
        listener: StatusListener<'_>,
    ) -> Result<ImportSummary, SyncError> {
        let result = self.import_sections(scheme, listener).await;
        listener(ImportStatus::Idle);

        if let Ok(summary) = &result {
            info!(
                shows = summary.shows,
                movies = summary.movies,
                episodes = summary.episodes,
                ratings = summary.ratings,
                lists = summary.lists,
                list_items = summary.list_items,
                skipped = summary.skipped,
                "Backup imported"
            );
        }
        result
    }

    async fn import_sections(
        &self,
        scheme: BackupScheme,
        listener: StatusListener<'_>,
    ) -> Result<ImportSummary, SyncError> {
        let mut summary = ImportSummary::default();
        self.import_shows(&scheme.shows, listener, &mut summary).await?;
        self.import_movies(&scheme.movies, listener, &mut summary).await?;
        // Lists last: their items reference shows and movies
        self.import_lists(&scheme.lists, listener, &mut summary).await?;
        Ok(summary)
    }

    // Shows

    async fn import_shows(
        &self,
        shows: &BackupShows,
        listener: StatusListener<'_>,
        summary: &mut ImportSummary,
    ) -> Result<(), SyncError> {
        let collections = [
            (CollectionKind::History, &shows.collection_history),
            (CollectionKind::Watchlist, &shows.collection_watchlist),
            (CollectionKind::Hidden, &shows.collection_hidden),
        ];

        for (kind, items) in collections {
            for item in items.iter() {
                cancel::check(&self.ctx.cancel)?;
                let membership = self
                    .ctx
                    .store
                    .read(|t| t.membership(MediaKind::Show, item.trakt_id))
                    .await;

                if let Some(current) = membership {
                    if kind == CollectionKind::History && current == CollectionKind::History {
                        summary.episodes += self.import_existing_episodes(item.trakt_id, shows).await;
                    }
                    continue;
                }

                listener(ImportStatus::Importing(item.title.clone()));
                if !ensure_details(&self.ctx, MediaKind::Show, item.trakt_id).await? {
                    summary.skipped += 1;
                    continue;
                }

                let record = CollectionRecord {
                    trakt_id: item.trakt_id,
                    tmdb_id: item.tmdb_id,
                    title: item.title.clone(),
                    created_at: parse_date_or_now(&item.added_at),
                    updated_at: parse_date_or_now(&item.updated_at),
                };

                if kind == CollectionKind::History {
                    summary.episodes += self.import_new_show(item, shows, record).await?;
                } else {
                    self.ctx
                        .store
                        .write(|t| t.set_membership(MediaKind::Show, kind, record))
                        .await;
                }
                summary.shows += 1;
            }
        }

        self.ctx
            .store
            .write(|t| {
                t.pinned_shows.extend(shows.progress_pinned.iter().copied());
                t.on_hold_shows.extend(shows.progress_on_hold.iter().copied());
            })
            .await;

        summary.ratings += self.import_show_ratings(shows).await?;
        Ok(())
    }

    /// Seasons and episodes of a show entering the history, all in one write.
    async fn import_new_show(
        &self,
        item: &BackupShow,
        shows: &BackupShows,
        record: CollectionRecord,
    ) -> Result<usize, SyncError> {
        let show_id = item.trakt_id;
        let seasons = cancel::remote(&self.ctx.cancel, self.ctx.remote.fetch_seasons(show_id)).await?;

        let episodes = backup_episodes(shows, show_id);
        let marks = WatchedMarks::backup(
            episodes
                .iter()
                .map(|e| (e.season_number, e.episode_number, e.added_at.as_deref().and_then(parse_date))),
            shows
                .progress_seasons
                .iter()
                .filter(|s| s.show_trakt_id == show_id)
                .map(|s| s.season_number),
        );

        let (details, watched_seasons, watched_episodes) = self
            .ctx
            .store
            .read(|t| {
                (
                    t.shows.get_by_id(&show_id),
                    t.watched_season_ids(&[show_id]),
                    t.watched_episode_ids(&[show_id]),
                )
            })
            .await;
        let Some(details) = details else {
            return Err(StoreError::MissingRow {
                table: MediaDetails::TABLE,
                key: show_id.to_string(),
            }
            .into());
        };

        let progress = ShowProgress::build(&details, &seasons, &marks, &watched_seasons, &watched_episodes);
        let watched = progress.watched_episodes();
        debug!(show_id, seasons = progress.seasons.len(), watched, "Importing show progress");

        self.ctx
            .store
            .transaction(|t| progress.write(t, CollectionKind::History, record))
            .await?;
        Ok(watched)
    }

    /// Mark backed-up episodes watched on a show already in the history.
    async fn import_existing_episodes(&self, show_id: TraktId, shows: &BackupShows) -> usize {
        let episodes = backup_episodes(shows, show_id);
        if episodes.is_empty() {
            return 0;
        }

        self.ctx
            .store
            .write(|t| {
                let local = t.episodes_for_show(show_id);
                let mut marked = 0;
                for backup in &episodes {
                    let found = local
                        .iter()
                        .find(|e| e.trakt_id == backup.trakt_id)
                        .or_else(|| {
                            local.iter().find(|e| {
                                e.season_number == backup.season_number
                                    && e.episode_number == backup.episode_number
                            })
                        });
                    let Some(episode) = found else { continue };
                    let watched_at = backup.added_at.as_deref().and_then(parse_date);
                    if t.mark_episode_watched(episode.trakt_id, watched_at) {
                        marked += 1;
                    }
                }
                marked
            })
            .await
    }

    async fn import_show_ratings(&self, shows: &BackupShows) -> Result<usize, SyncError> {
        let mut ratings = Vec::new();
        for r in &shows.ratings_shows {
            ratings.push(RatingRecord::new(r.trakt_id, RatingKind::Show, r.rating, parse_date_or_now(&r.rated_at)));
        }
        for r in &shows.ratings_seasons {
            ratings.push(
                RatingRecord::new(r.trakt_id, RatingKind::Season, r.rating, parse_date_or_now(&r.rated_at))
                    .with_numbers(u32::try_from(r.season_number).ok(), None),
            );
        }
        for r in &shows.ratings_episodes {
            ratings.push(
                RatingRecord::new(r.trakt_id, RatingKind::Episode, r.rating, parse_date_or_now(&r.rated_at))
                    .with_numbers(
                        u32::try_from(r.season_number).ok(),
                        u32::try_from(r.episode_number).ok(),
                    ),
            );
        }
        self.import_ratings(ratings).await
    }

    /// Insert ratings that have no local counterpart. Local ratings always win.
    async fn import_ratings(&self, ratings: Vec<RatingRecord>) -> Result<usize, SyncError> {
        let imported = self
            .ctx
            .store
            .transaction(|t| {
                let mut imported = 0;
                for rating in ratings {
                    if rating.rating > MAX_RATING {
                        warn!(kind = %rating.kind, trakt_id = rating.trakt_id, rating = rating.rating, "Skipping invalid rating");
                        continue;
                    }
                    if t.ratings.exists(&(rating.kind, rating.trakt_id)) {
                        continue;
                    }
                    t.replace_rating(rating)?;
                    imported += 1;
                }
                Ok::<_, StoreError>(imported)
            })
            .await?;
        Ok(imported)
    }

    // Movies

    async fn import_movies(
        &self,
        movies: &BackupMovies,
        listener: StatusListener<'_>,
        summary: &mut ImportSummary,
    ) -> Result<(), SyncError> {
        let collections = [
            (CollectionKind::History, &movies.collection_history),
            (CollectionKind::Watchlist, &movies.collection_watchlist),
            (CollectionKind::Hidden, &movies.collection_hidden),
        ];

        for (kind, items) in collections {
            for item in items.iter() {
                cancel::check(&self.ctx.cancel)?;
                match self.import_movie(kind, item, listener).await? {
                    ItemOutcome::Added => summary.movies += 1,
                    ItemOutcome::Unknown => summary.skipped += 1,
                    ItemOutcome::Present => {}
                }
            }
        }

        self.ctx
            .store
            .write(|t| t.pinned_movies.extend(movies.progress_pinned.iter().copied()))
            .await;

        let ratings = movies
            .ratings_movies
            .iter()
            .map(|r| RatingRecord::new(r.trakt_id, RatingKind::Movie, r.rating, parse_date_or_now(&r.rated_at)))
            .collect();
        summary.ratings += self.import_ratings(ratings).await?;
        Ok(())
    }

    async fn import_movie(
        &self,
        kind: CollectionKind,
        item: &BackupMovie,
        listener: StatusListener<'_>,
    ) -> Result<ItemOutcome, SyncError> {
        let collected = self
            .ctx
            .store
            .read(|t| t.membership(MediaKind::Movie, item.trakt_id).is_some())
            .await;
        if collected {
            return Ok(ItemOutcome::Present);
        }

        listener(ImportStatus::Importing(item.title.clone()));
        if !ensure_details(&self.ctx, MediaKind::Movie, item.trakt_id).await? {
            return Ok(ItemOutcome::Unknown);
        }

        let added_at = parse_date_or_now(&item.added_at);
        let record = CollectionRecord {
            trakt_id: item.trakt_id,
            tmdb_id: item.tmdb_id,
            title: item.title.clone(),
            created_at: added_at,
            updated_at: added_at,
        };
        self.ctx
            .store
            .write(|t| t.set_membership(MediaKind::Movie, kind, record))
            .await;
        Ok(ItemOutcome::Added)
    }

    // Lists

    async fn import_lists(
        &self,
        lists: &BackupLists,
        listener: StatusListener<'_>,
        summary: &mut ImportSummary,
    ) -> Result<(), SyncError> {
        for backup in &lists.lists {
            cancel::check(&self.ctx.cancel)?;
            listener(ImportStatus::Importing(backup.name.clone()));

            let (list_id, created) = self.resolve_list(backup).await?;
            if created {
                summary.lists += 1;
            }

            for item in &backup.items {
                cancel::check(&self.ctx.cancel)?;
                let Ok(kind) = MediaKind::from_str(&item.kind) else {
                    warn!(list = %backup.name, kind = %item.kind, "Skipping list item of unknown kind");
                    summary.skipped += 1;
                    continue;
                };

                let present = self
                    .ctx
                    .store
                    .read(|t| {
                        t.list_items(list_id)
                            .iter()
                            .any(|i| i.trakt_id == item.trakt_id && i.kind == kind)
                    })
                    .await;
                if present {
                    continue;
                }

                if !ensure_details(&self.ctx, kind, item.trakt_id).await? {
                    summary.skipped += 1;
                    continue;
                }

                let added = self
                    .ctx
                    .store
                    .write(|t| {
                        t.add_to_list(
                            list_id,
                            item.trakt_id,
                            kind,
                            parse_date_or_now(&item.listed_at),
                            parse_date_or_now(&item.created_at),
                            parse_date_or_now(&item.updated_at),
                        )
                    })
                    .await?;
                if added.is_some() {
                    summary.list_items += 1;
                }
            }
        }
        Ok(())
    }

    /// Find the local list matching a backup list by local id, then by
    /// remote id. Creates it, keeping the backup's id, when neither matches.
    async fn resolve_list(&self, backup: &BackupList) -> Result<(i64, bool), SyncError> {
        let resolved = self
            .ctx
            .store
            .write(|t| {
                let by_id = t.custom_lists.get(&backup.id).map(|l| l.id);
                let by_trakt_id = || {
                    backup.trakt_id.and_then(|remote_id| {
                        t.custom_lists
                            .iter()
                            .find(|l| l.trakt_id == Some(remote_id))
                            .map(|l| l.id)
                    })
                };
                if let Some(id) = by_id.or_else(by_trakt_id) {
                    return Ok((id, false));
                }

                let now = Utc::now();
                let list = CustomList {
                    id: backup.id,
                    trakt_id: backup.trakt_id,
                    slug: backup.slug.clone(),
                    name: backup.name.clone(),
                    description: backup.description.clone(),
                    privacy: backup.privacy.clone(),
                    item_count: 0,
                    created_at: parse_date(&backup.created_at).unwrap_or(now),
                    updated_at: parse_date(&backup.updated_at).unwrap_or(now),
                };
                t.restore_list(list).map(|id| (id, true))
            })
            .await?;
        Ok(resolved)
    }
}

fn backup_episodes(shows: &BackupShows, show_id: TraktId) -> Vec<&BackupEpisode> {
    let mut seen = HashSet::new();
    shows
        .progress_episodes
        .iter()
        .filter(|e| e.show_trakt_id == show_id)
        .filter(|e| seen.insert((e.season_number, e.episode_number)))
        .collect()
}
