use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{TmdbId, TraktId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Show,
    Movie,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Show, MediaKind::Movie];

    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Show => "shows",
            MediaKind::Movie => "movies",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Show => "show",
            MediaKind::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(MediaKind::Show),
            "movie" => Ok(MediaKind::Movie),
            other => Err(format!("Unknown media kind: {}", other)),
        }
    }
}

/// Cached show or movie details, fetched from the remote service on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaDetails {
    pub trakt_id: TraktId,
    pub tmdb_id: TmdbId,
    pub title: String,
    pub year: Option<u32>,
}
