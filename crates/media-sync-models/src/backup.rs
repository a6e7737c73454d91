//! Backup document, schema version 2.
//!
//! All dates are ISO 8601 strings in UTC with millisecond precision,
//! e.g. `2021-01-01T00:00:00.000Z`. Keys are kept short to keep files small.

use serde::{Deserialize, Serialize};

use crate::ids::{TmdbId, TraktId, UNKNOWN_ID};

pub const SCHEME_VERSION: u32 = 2;
pub const SCHEME_PLATFORM: &str = "android";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupScheme {
    pub version: u32,
    pub platform: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub shows: BackupShows,
    #[serde(default)]
    pub movies: BackupMovies,
    #[serde(default)]
    pub lists: BackupLists,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupShows {
    #[serde(rename = "cH", default)]
    pub collection_history: Vec<BackupShow>,
    #[serde(rename = "cW", default)]
    pub collection_watchlist: Vec<BackupShow>,
    #[serde(rename = "cHid", default)]
    pub collection_hidden: Vec<BackupShow>,
    #[serde(rename = "pEp", default)]
    pub progress_episodes: Vec<BackupEpisode>,
    #[serde(rename = "pSe", default)]
    pub progress_seasons: Vec<BackupSeason>,
    #[serde(rename = "pP", default)]
    pub progress_pinned: Vec<TraktId>,
    #[serde(rename = "pOH", default)]
    pub progress_on_hold: Vec<TraktId>,
    #[serde(rename = "rS", default)]
    pub ratings_shows: Vec<BackupShowRating>,
    #[serde(rename = "rSe", default)]
    pub ratings_seasons: Vec<BackupSeasonRating>,
    #[serde(rename = "rEp", default)]
    pub ratings_episodes: Vec<BackupEpisodeRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupShow {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "tmId")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "t")]
    pub title: String,
    #[serde(rename = "a")]
    pub added_at: String,
    #[serde(rename = "u")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupSeason {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "stmId")]
    pub show_tmdb_id: TmdbId,
    #[serde(rename = "sN")]
    pub season_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupEpisode {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "stmId")]
    pub show_tmdb_id: TmdbId,
    #[serde(rename = "eN")]
    pub episode_number: u32,
    #[serde(rename = "sN")]
    pub season_number: u32,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>, // Watched-at date, absent for episodes watched before it was tracked
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupShowRating {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "tmId")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "r")]
    pub rating: u8,
    #[serde(rename = "rA")]
    pub rated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupSeasonRating {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "stmId")]
    pub show_tmdb_id: TmdbId,
    #[serde(rename = "sN")]
    pub season_number: i64,
    #[serde(rename = "r")]
    pub rating: u8,
    #[serde(rename = "rA")]
    pub rated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupEpisodeRating {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "stmId")]
    pub show_tmdb_id: TmdbId,
    #[serde(rename = "sN")]
    pub season_number: i64,
    #[serde(rename = "eN")]
    pub episode_number: i64,
    #[serde(rename = "r")]
    pub rating: u8,
    #[serde(rename = "rA")]
    pub rated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupMovies {
    #[serde(rename = "cH", default)]
    pub collection_history: Vec<BackupMovie>,
    #[serde(rename = "cW", default)]
    pub collection_watchlist: Vec<BackupMovie>,
    #[serde(rename = "cHid", default)]
    pub collection_hidden: Vec<BackupMovie>,
    #[serde(rename = "pP", default)]
    pub progress_pinned: Vec<TraktId>,
    #[serde(rename = "rM", default)]
    pub ratings_movies: Vec<BackupMovieRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupMovie {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "tmId")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "t")]
    pub title: String,
    #[serde(rename = "a")]
    pub added_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupMovieRating {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "tmId")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "r")]
    pub rating: u8,
    #[serde(rename = "rA")]
    pub rated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackupLists {
    #[serde(rename = "l", default)]
    pub lists: Vec<BackupList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupList {
    pub id: i64,
    #[serde(rename = "tId", default)]
    pub trakt_id: Option<TraktId>,
    #[serde(rename = "sId")]
    pub slug: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "d", default)]
    pub description: Option<String>,
    #[serde(rename = "p")]
    pub privacy: String,
    #[serde(rename = "ic")]
    pub item_count: u64,
    #[serde(rename = "c")]
    pub created_at: String,
    #[serde(rename = "u")]
    pub updated_at: String,
    #[serde(rename = "it", default)]
    pub items: Vec<BackupListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupListItem {
    pub id: i64,
    #[serde(rename = "lId")]
    pub list_id: i64,
    #[serde(rename = "tId")]
    pub trakt_id: TraktId,
    // Not written by every client
    #[serde(rename = "tmId", default = "unknown_id")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "t")]
    pub kind: String, // "show" or "movie"
    #[serde(rename = "r")]
    pub rank: i64,
    #[serde(rename = "l")]
    pub listed_at: String,
    #[serde(rename = "c")]
    pub created_at: String,
    #[serde(rename = "u")]
    pub updated_at: String,
}

fn unknown_id() -> TmdbId {
    UNKNOWN_ID
}
