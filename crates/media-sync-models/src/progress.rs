use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TmdbId, TraktId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonRecord {
    pub trakt_id: TraktId,
    pub show_trakt_id: TraktId,
    pub season_number: u32,
    pub episode_count: u32,
    pub is_watched: bool,
}

/// Watch progress for a single episode. `is_watched` only ever goes from false to true on import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub trakt_id: TraktId,
    pub season_trakt_id: TraktId,
    pub show_trakt_id: TraktId,
    pub show_tmdb_id: TmdbId,
    pub season_number: u32,
    pub episode_number: u32,
    pub is_watched: bool,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub last_exported_at: Option<DateTime<Utc>>, // None until pushed to the remote history
}

impl EpisodeRecord {
    /// Watched locally but not yet pushed to the remote history.
    pub fn is_export_pending(&self) -> bool {
        if !self.is_watched {
            return false;
        }
        match (self.last_exported_at, self.last_watched_at) {
            (None, _) => true,
            (Some(exported), Some(watched)) => watched > exported,
            (Some(_), None) => false,
        }
    }
}
