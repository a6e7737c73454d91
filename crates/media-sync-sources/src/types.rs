//! Remote-side shapes handed to and returned from a `RemoteService`.

use chrono::{DateTime, Utc};
use media_sync_models::{MediaDetails, MediaKind, RatingKind, TraktId};
use serde::{Deserialize, Serialize};

/// A rating as held by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRating {
    pub trakt_id: Option<TraktId>, // None when the remote entity carries no id
    pub kind: RatingKind,
    pub rating: u8,
    pub rated_at: String, // ISO-8601 as sent by the remote
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl RemoteRating {
    pub fn rated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.rated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEpisode {
    pub trakt_id: TraktId,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSeason {
    pub trakt_id: TraktId,
    pub season_number: u32,
    pub episodes: Vec<RemoteEpisode>,
}

impl RemoteSeason {
    pub fn episode_count(&self) -> u32 {
        self.episodes.len() as u32
    }
}

/// A watched (season, episode) pair of a show in the remote history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub watched_at: Option<DateTime<Utc>>,
}

/// An entry of the remote watched history.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteWatched {
    pub media: MediaDetails,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub episodes: Vec<WatchedEpisode>, // Empty for movies
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteWatchlistItem {
    pub media: MediaDetails,
    pub listed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCustomList {
    pub trakt_id: TraktId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub privacy: String,
    pub item_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteListEntry {
    pub media: MediaDetails,
    pub kind: MediaKind,
    pub rank: i64,
    pub listed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RequestIds {
    pub trakt: TraktId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingRequestValue {
    pub rating: u8,
    pub rated_at: String,
    pub ids: RequestIds,
}

/// Body of a ratings POST. Empty kinds are left out of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shows: Vec<RatingRequestValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasons: Vec<RatingRequestValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<RatingRequestValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<RatingRequestValue>,
}

impl RatingRequest {
    pub fn single(kind: RatingKind, value: RatingRequestValue) -> Self {
        let mut request = Self::default();
        request.bucket_mut(kind).push(value);
        request
    }

    pub fn bucket_mut(&mut self, kind: RatingKind) -> &mut Vec<RatingRequestValue> {
        match kind {
            RatingKind::Show => &mut self.shows,
            RatingKind::Season => &mut self.seasons,
            RatingKind::Episode => &mut self.episodes,
            RatingKind::Movie => &mut self.movies,
        }
    }

    pub fn len(&self) -> usize {
        self.shows.len() + self.seasons.len() + self.episodes.len() + self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncItem {
    pub ids: RequestIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<String>,
}

impl SyncItem {
    pub fn new(trakt_id: TraktId) -> Self {
        Self {
            ids: RequestIds { trakt: trakt_id },
            watched_at: None,
        }
    }

    pub fn watched_at(mut self, at: DateTime<Utc>) -> Self {
        self.watched_at = Some(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        self
    }
}

/// Body of a history, watchlist or list-items POST.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncItemsRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shows: Vec<SyncItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<SyncItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<SyncItem>,
}

impl SyncItemsRequest {
    pub fn push_media(&mut self, kind: MediaKind, item: SyncItem) {
        match kind {
            MediaKind::Show => self.shows.push(item),
            MediaKind::Movie => self.movies.push(item),
        }
    }

    pub fn len(&self) -> usize {
        self.shows.len() + self.movies.len() + self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_request_skips_empty_kinds() {
        let request = RatingRequest::single(
            RatingKind::Season,
            RatingRequestValue {
                rating: 7,
                rated_at: "2024-01-01T00:00:00.000Z".to_string(),
                ids: RequestIds { trakt: 3 },
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("shows").is_none());
        assert_eq!(json["seasons"][0]["ids"]["trakt"], 3);
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn test_remote_rating_unparseable_date() {
        let rating = RemoteRating {
            trakt_id: Some(1),
            kind: RatingKind::Show,
            rating: 5,
            rated_at: "yesterday".to_string(),
            season_number: None,
            episode_number: None,
        };
        assert!(rating.rated_at().is_none());
    }
}
