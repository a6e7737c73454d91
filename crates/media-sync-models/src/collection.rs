use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{TmdbId, TraktId};

/// Which user collection an entity belongs to.
///
/// An entity sits in at most one of these at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    History,
    Watchlist,
    Hidden,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::History,
        CollectionKind::Watchlist,
        CollectionKind::Hidden,
    ];
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::History => "history",
            CollectionKind::Watchlist => "watchlist",
            CollectionKind::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionRecord {
    pub trakt_id: TraktId,
    pub tmdb_id: TmdbId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
