//! Snapshot of the local store as a backup document. Reads only.

use std::collections::HashMap;

use chrono::Utc;
use media_sync_models::{
    BackupEpisode, BackupEpisodeRating, BackupList, BackupListItem, BackupLists, BackupMovie,
    BackupMovieRating, BackupMovies, BackupScheme, BackupSeason, BackupSeasonRating, BackupShow,
    BackupShowRating, BackupShows, CollectionKind, CollectionRecord, MediaKind, RatingKind,
    TmdbId, TraktId, SCHEME_PLATFORM, SCHEME_VERSION, UNKNOWN_ID,
};
use media_sync_store::{LocalStore, Tables};
use tracing::info;

use crate::dates::format_date;
use crate::error::SyncError;

pub async fn export_backup(store: &LocalStore) -> Result<BackupScheme, SyncError> {
    let (shows, movies, lists) = tokio::join!(
        store.read(export_shows),
        store.read(export_movies),
        store.read(export_lists),
    );

    info!(
        shows = shows.collection_history.len() + shows.collection_watchlist.len() + shows.collection_hidden.len(),
        episodes = shows.progress_episodes.len(),
        movies = movies.collection_history.len() + movies.collection_watchlist.len() + movies.collection_hidden.len(),
        lists = lists.lists.len(),
        "Backup created"
    );

    Ok(BackupScheme {
        version: SCHEME_VERSION,
        platform: SCHEME_PLATFORM.to_string(),
        created_at: format_date(Utc::now()),
        shows,
        movies,
        lists,
    })
}

pub fn to_json(scheme: &BackupScheme) -> Result<String, SyncError> {
    serde_json::to_string(scheme).map_err(|e| SyncError::InvalidBackup(e.to_string()))
}

fn tmdb_or_unknown(ids: &HashMap<TraktId, TmdbId>, id: TraktId) -> TmdbId {
    ids.get(&id).copied().unwrap_or(UNKNOWN_ID)
}

fn backup_show(record: CollectionRecord) -> BackupShow {
    BackupShow {
        trakt_id: record.trakt_id,
        tmdb_id: record.tmdb_id,
        title: record.title,
        added_at: format_date(record.created_at),
        updated_at: format_date(record.updated_at),
    }
}

fn backup_movie(record: CollectionRecord) -> BackupMovie {
    BackupMovie {
        trakt_id: record.trakt_id,
        tmdb_id: record.tmdb_id,
        title: record.title,
        added_at: format_date(record.created_at),
    }
}

fn export_shows(t: &Tables) -> BackupShows {
    let collection = |kind| -> Vec<BackupShow> {
        t.collection(MediaKind::Show, kind)
            .get_all()
            .into_iter()
            .map(backup_show)
            .collect()
    };

    let episodes: Vec<_> = t.episodes.iter().filter(|e| e.is_watched).collect();
    let seasons: Vec<_> = t.seasons.iter().filter(|s| s.is_watched).collect();

    // One lookup for every owning show
    let mut show_ids: Vec<TraktId> = episodes
        .iter()
        .map(|e| e.show_trakt_id)
        .chain(seasons.iter().map(|s| s.show_trakt_id))
        .collect();
    show_ids.sort_unstable();
    show_ids.dedup();
    let show_tmdb = t.tmdb_ids_for(MediaKind::Show, &show_ids);

    let progress_episodes = episodes
        .iter()
        .map(|e| BackupEpisode {
            trakt_id: e.trakt_id,
            show_trakt_id: e.show_trakt_id,
            show_tmdb_id: show_tmdb.get(&e.show_trakt_id).copied().unwrap_or(e.show_tmdb_id),
            episode_number: e.episode_number,
            season_number: e.season_number,
            added_at: e.last_watched_at.map(format_date),
        })
        .collect();

    let progress_seasons = seasons
        .iter()
        .map(|s| BackupSeason {
            trakt_id: s.trakt_id,
            show_trakt_id: s.show_trakt_id,
            show_tmdb_id: tmdb_or_unknown(&show_tmdb, s.show_trakt_id),
            season_number: s.season_number,
        })
        .collect();

    let show_ratings = t.ratings_by_kind(RatingKind::Show);
    let rated_ids: Vec<TraktId> = show_ratings.iter().map(|r| r.trakt_id).collect();
    let rated_tmdb = t.tmdb_ids_for(MediaKind::Show, &rated_ids);
    let ratings_shows = show_ratings
        .into_iter()
        .map(|r| BackupShowRating {
            trakt_id: r.trakt_id,
            tmdb_id: tmdb_or_unknown(&rated_tmdb, r.trakt_id),
            rating: r.rating,
            rated_at: format_date(r.rated_at),
        })
        .collect();

    let ratings_seasons = t
        .ratings_by_kind(RatingKind::Season)
        .into_iter()
        .map(|r| {
            let season = t.seasons.get(&r.trakt_id);
            let show_id = season.map(|s| s.show_trakt_id).unwrap_or(UNKNOWN_ID);
            BackupSeasonRating {
                trakt_id: r.trakt_id,
                show_trakt_id: show_id,
                show_tmdb_id: t.shows.get(&show_id).map(|d| d.tmdb_id).unwrap_or(UNKNOWN_ID),
                season_number: r
                    .season_number
                    .or(season.map(|s| s.season_number))
                    .map(i64::from)
                    .unwrap_or(UNKNOWN_ID),
                rating: r.rating,
                rated_at: format_date(r.rated_at),
            }
        })
        .collect();

    let ratings_episodes = t
        .ratings_by_kind(RatingKind::Episode)
        .into_iter()
        .map(|r| {
            let episode = t.episodes.get(&r.trakt_id);
            let show_id = episode.map(|e| e.show_trakt_id).unwrap_or(UNKNOWN_ID);
            BackupEpisodeRating {
                trakt_id: r.trakt_id,
                show_trakt_id: show_id,
                show_tmdb_id: episode.map(|e| e.show_tmdb_id).unwrap_or(UNKNOWN_ID),
                season_number: r
                    .season_number
                    .or(episode.map(|e| e.season_number))
                    .map(i64::from)
                    .unwrap_or(UNKNOWN_ID),
                episode_number: r
                    .episode_number
                    .or(episode.map(|e| e.episode_number))
                    .map(i64::from)
                    .unwrap_or(UNKNOWN_ID),
                rating: r.rating,
                rated_at: format_date(r.rated_at),
            }
        })
        .collect();

    BackupShows {
        collection_history: collection(CollectionKind::History),
        collection_watchlist: collection(CollectionKind::Watchlist),
        collection_hidden: collection(CollectionKind::Hidden),
        progress_episodes,
        progress_seasons,
        progress_pinned: t.pinned_shows.iter().copied().collect(),
        progress_on_hold: t.on_hold_shows.iter().copied().collect(),
        ratings_shows,
        ratings_seasons,
        ratings_episodes,
    }
}

fn export_movies(t: &Tables) -> BackupMovies {
    let collection = |kind| -> Vec<BackupMovie> {
        t.collection(MediaKind::Movie, kind)
            .get_all()
            .into_iter()
            .map(backup_movie)
            .collect()
    };

    let ratings = t.ratings_by_kind(RatingKind::Movie);
    let ids: Vec<TraktId> = ratings.iter().map(|r| r.trakt_id).collect();
    let tmdb = t.tmdb_ids_for(MediaKind::Movie, &ids);

    BackupMovies {
        collection_history: collection(CollectionKind::History),
        collection_watchlist: collection(CollectionKind::Watchlist),
        collection_hidden: collection(CollectionKind::Hidden),
        progress_pinned: t.pinned_movies.iter().copied().collect(),
        ratings_movies: ratings
            .into_iter()
            .map(|r| BackupMovieRating {
                trakt_id: r.trakt_id,
                tmdb_id: tmdb_or_unknown(&tmdb, r.trakt_id),
                rating: r.rating,
                rated_at: format_date(r.rated_at),
            })
            .collect(),
    }
}

fn export_lists(t: &Tables) -> BackupLists {
    let lists = t
        .custom_lists
        .get_all()
        .into_iter()
        .map(|list| {
            let items = t.list_items(list.id);
            let mut tmdb: HashMap<MediaKind, HashMap<TraktId, TmdbId>> = HashMap::new();
            for media in MediaKind::ALL {
                let ids: Vec<TraktId> = items
                    .iter()
                    .filter(|i| i.kind == media)
                    .map(|i| i.trakt_id)
                    .collect();
                tmdb.insert(media, t.tmdb_ids_for(media, &ids));
            }

            BackupList {
                id: list.id,
                trakt_id: list.trakt_id,
                slug: list.slug,
                name: list.name,
                description: list.description,
                privacy: list.privacy,
                item_count: list.item_count,
                created_at: format_date(list.created_at),
                updated_at: format_date(list.updated_at),
                items: items
                    .into_iter()
                    .map(|i| BackupListItem {
                        id: i.id,
                        list_id: i.list_id,
                        trakt_id: i.trakt_id,
                        tmdb_id: tmdb
                            .get(&i.kind)
                            .and_then(|ids| ids.get(&i.trakt_id))
                            .copied()
                            .unwrap_or(UNKNOWN_ID),
                        kind: i.kind.as_str().to_string(),
                        rank: i.rank,
                        listed_at: format_date(i.listed_at),
                        created_at: format_date(i.created_at),
                        updated_at: format_date(i.updated_at),
                    })
                    .collect(),
            }
        })
        .collect();

    BackupLists { lists }
}
