use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::TraktId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RatingKind {
    Show,
    Season,
    Episode,
    Movie,
}

impl RatingKind {
    pub const ALL: [RatingKind; 4] = [
        RatingKind::Show,
        RatingKind::Season,
        RatingKind::Episode,
        RatingKind::Movie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingKind::Show => "show",
            RatingKind::Season => "season",
            RatingKind::Episode => "episode",
            RatingKind::Movie => "movie",
        }
    }

    /// Plural form used by the remote sync endpoints.
    pub fn plural(&self) -> &'static str {
        match self {
            RatingKind::Show => "shows",
            RatingKind::Season => "seasons",
            RatingKind::Episode => "episodes",
            RatingKind::Movie => "movies",
        }
    }
}

impl fmt::Display for RatingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user rating. At most one record exists per (trakt_id, kind).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingRecord {
    pub trakt_id: TraktId,
    pub kind: RatingKind,
    pub rating: u8, // 1-10 integer
    pub season_number: Option<u32>, // Set for seasons and episodes
    pub episode_number: Option<u32>, // Set for episodes
    pub rated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RatingRecord {
    pub fn new(trakt_id: TraktId, kind: RatingKind, rating: u8, rated_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            trakt_id,
            kind,
            rating,
            season_number: None,
            episode_number: None,
            rated_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_numbers(mut self, season: Option<u32>, episode: Option<u32>) -> Self {
        self.season_number = season;
        self.episode_number = episode;
        self
    }
}
