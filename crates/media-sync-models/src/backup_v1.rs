//! Backup document, schema version 1. Read-only: only ever migrated forward.
//!
//! Differs from version 2 by lacking the platform tag, the creation date,
//! show tmdb ids on progress entries, tmdb ids on list items and all ratings.

use serde::Deserialize;

use crate::ids::{TmdbId, TraktId};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupScheme1 {
    pub version: u32,
    #[serde(default)]
    pub shows: BackupShows1,
    #[serde(default)]
    pub movies: BackupMovies1,
    #[serde(default)]
    pub lists: BackupLists1,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BackupShows1 {
    #[serde(rename = "cH", default)]
    pub collection_history: Vec<BackupShow1>,
    #[serde(rename = "cW", default)]
    pub collection_watchlist: Vec<BackupShow1>,
    #[serde(rename = "cHid", default)]
    pub collection_hidden: Vec<BackupShow1>,
    #[serde(rename = "pEp", default)]
    pub progress_episodes: Vec<BackupEpisode1>,
    #[serde(rename = "pSe", default)]
    pub progress_seasons: Vec<BackupSeason1>,
    #[serde(rename = "pP", default)]
    pub progress_pinned: Vec<TraktId>,
    #[serde(rename = "pOH", default)]
    pub progress_on_hold: Vec<TraktId>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupShow1 {
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

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupSeason1 {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "sN")]
    pub season_number: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupEpisode1 {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "sId")]
    pub show_trakt_id: TraktId,
    #[serde(rename = "eN")]
    pub episode_number: u32,
    #[serde(rename = "sN")]
    pub season_number: u32,
    #[serde(rename = "a", default)]
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BackupMovies1 {
    #[serde(rename = "cH", default)]
    pub collection_history: Vec<BackupMovie1>,
    #[serde(rename = "cW", default)]
    pub collection_watchlist: Vec<BackupMovie1>,
    #[serde(rename = "cHid", default)]
    pub collection_hidden: Vec<BackupMovie1>,
    #[serde(rename = "pP", default)]
    pub progress_pinned: Vec<TraktId>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupMovie1 {
    #[serde(rename = "id")]
    pub trakt_id: TraktId,
    #[serde(rename = "tmId")]
    pub tmdb_id: TmdbId,
    #[serde(rename = "t")]
    pub title: String,
    #[serde(rename = "a")]
    pub added_at: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BackupLists1 {
    #[serde(rename = "l", default)]
    pub lists: Vec<BackupList1>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupList1 {
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
    pub items: Vec<BackupListItem1>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackupListItem1 {
    pub id: i64,
    #[serde(rename = "lId")]
    pub list_id: i64,
    #[serde(rename = "tId")]
    pub trakt_id: TraktId,
    #[serde(rename = "t")]
    pub kind: String,
    #[serde(rename = "r")]
    pub rank: i64,
    #[serde(rename = "l")]
    pub listed_at: String,
    #[serde(rename = "c")]
    pub created_at: String,
    #[serde(rename = "u")]
    pub updated_at: String,
}
