//! Upgrades of older backup schemes to the current one.

use chrono::Utc;
use media_sync_models::backup_v1::{
    BackupEpisode1, BackupList1, BackupListItem1, BackupMovie1, BackupSeason1, BackupShow1,
};
use media_sync_models::{
    BackupEpisode, BackupList, BackupListItem, BackupLists, BackupMovie, BackupMovies,
    BackupScheme, BackupScheme1, BackupSeason, BackupShow, BackupShows, SCHEME_PLATFORM,
    SCHEME_VERSION, UNKNOWN_ID,
};

use crate::dates::format_date;

/// Version 1 has no ratings, no platform tag and no tmdb ids on seasons,
/// episodes and list items. Those take `UNKNOWN_ID` or empty defaults.
pub fn migrate_v1(old: BackupScheme1) -> BackupScheme {
    let shows = old.shows;
    let movies = old.movies;

    BackupScheme {
        version: SCHEME_VERSION,
        platform: SCHEME_PLATFORM.to_string(),
        created_at: format_date(Utc::now()),
        shows: BackupShows {
            collection_history: shows.collection_history.into_iter().map(show).collect(),
            collection_watchlist: shows.collection_watchlist.into_iter().map(show).collect(),
            collection_hidden: shows.collection_hidden.into_iter().map(show).collect(),
            progress_episodes: shows.progress_episodes.into_iter().map(episode).collect(),
            progress_seasons: shows.progress_seasons.into_iter().map(season).collect(),
            progress_pinned: shows.progress_pinned,
            progress_on_hold: shows.progress_on_hold,
            ratings_shows: Vec::new(),
            ratings_seasons: Vec::new(),
            ratings_episodes: Vec::new(),
        },
        movies: BackupMovies {
            collection_history: movies.collection_history.into_iter().map(movie).collect(),
            collection_watchlist: movies.collection_watchlist.into_iter().map(movie).collect(),
            collection_hidden: movies.collection_hidden.into_iter().map(movie).collect(),
            progress_pinned: movies.progress_pinned,
            ratings_movies: Vec::new(),
        },
        lists: BackupLists {
            lists: old.lists.lists.into_iter().map(list).collect(),
        },
    }
}

fn show(s: BackupShow1) -> BackupShow {
    BackupShow {
        trakt_id: s.trakt_id,
        tmdb_id: s.tmdb_id,
        title: s.title,
        added_at: s.added_at,
        updated_at: s.updated_at,
    }
}

fn season(s: BackupSeason1) -> BackupSeason {
    BackupSeason {
        trakt_id: s.trakt_id,
        show_trakt_id: s.show_trakt_id,
        show_tmdb_id: UNKNOWN_ID,
        season_number: s.season_number,
    }
}

fn episode(e: BackupEpisode1) -> BackupEpisode {
    BackupEpisode {
        trakt_id: e.trakt_id,
        show_trakt_id: e.show_trakt_id,
        show_tmdb_id: UNKNOWN_ID,
        episode_number: e.episode_number,
        season_number: e.season_number,
        added_at: e.added_at,
    }
}

fn movie(m: BackupMovie1) -> BackupMovie {
    BackupMovie {
        trakt_id: m.trakt_id,
        tmdb_id: m.tmdb_id,
        title: m.title,
        added_at: m.added_at,
    }
}

fn list(l: BackupList1) -> BackupList {
    BackupList {
        id: l.id,
        trakt_id: l.trakt_id,
        slug: l.slug,
        name: l.name,
        description: l.description,
        privacy: l.privacy,
        item_count: l.item_count,
        created_at: l.created_at,
        updated_at: l.updated_at,
        items: l.items.into_iter().map(list_item).collect(),
    }
}

fn list_item(i: BackupListItem1) -> BackupListItem {
    BackupListItem {
        id: i.id,
        list_id: i.list_id,
        trakt_id: i.trakt_id,
        tmdb_id: UNKNOWN_ID,
        kind: i.kind,
        rank: i.rank,
        listed_at: i.listed_at,
        created_at: i.created_at,
        updated_at: i.updated_at,
    }
}
