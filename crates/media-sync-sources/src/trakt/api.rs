use chrono::{DateTime, SecondsFormat, Utc};
use media_sync_models::{MediaDetails, MediaKind, RatingKind, TraktId, UNKNOWN_ID};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;
use crate::types::{
    RatingRequest, RemoteCustomList, RemoteEpisode, RemoteListEntry, RemoteRating, RemoteSeason,
    RemoteWatched, RemoteWatchlistItem, SyncItemsRequest, WatchedEpisode,
};

/// Connection parameters shared by every authenticated call.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub base_url: &'a str,
    pub access_token: &'a str,
    pub client_id: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TraktIds {
    trakt: Option<i64>,
    tmdb: Option<i64>,
    slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktMedia {
    title: Option<String>,
    year: Option<u32>,
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktSeasonRef {
    number: u32,
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktEpisode {
    season: u32,
    number: u32,
    title: Option<String>,
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktRatingItem {
    rated_at: String,
    rating: u8,
    #[serde(rename = "type")]
    item_type: String,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
    season: Option<TraktSeasonRef>,
    episode: Option<TraktEpisode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktSeason {
    number: u32,
    ids: TraktIds,
    #[serde(default)]
    episodes: Vec<TraktEpisode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedEpisode {
    number: u32,
    last_watched_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedSeason {
    number: u32,
    #[serde(default)]
    episodes: Vec<TraktWatchedEpisode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedItem {
    last_watched_at: Option<String>,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
    #[serde(default)]
    seasons: Vec<TraktWatchedSeason>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchlistItem {
    listed_at: Option<String>,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktList {
    name: String,
    description: Option<String>,
    privacy: Option<String>,
    item_count: Option<u64>,
    created_at: Option<String>,
    updated_at: Option<String>,
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktListItem {
    rank: Option<i64>,
    listed_at: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// ISO-8601 in UTC with millisecond precision, as the remote expects.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_details(media: TraktMedia) -> Option<MediaDetails> {
    Some(MediaDetails {
        trakt_id: media.ids.trakt?,
        tmdb_id: media.ids.tmdb.unwrap_or(UNKNOWN_ID),
        title: media.title.unwrap_or_default(),
        year: media.year,
    })
}

fn request(client: &Client, method: Method, endpoint: Endpoint<'_>, path: &str) -> RequestBuilder {
    client
        .request(method, format!("{}{}", endpoint.base_url, path))
        .header("Authorization", format!("Bearer {}", endpoint.access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", endpoint.client_id)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
}

/// Turn a non-success response into the matching `SourceError`.
async fn check(response: Response, what: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(SourceError::from_status(
            status.as_u16(),
            format!("Failed to {}: {} - {}", what, status, error_text),
        ));
    }
    Ok(response)
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    endpoint: Endpoint<'_>,
    path: &str,
    what: &str,
) -> Result<T, SourceError> {
    let response = request(client, Method::GET, endpoint, path).send().await?;
    let response = check(response, what).await?;
    Ok(response.json().await?)
}

async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    endpoint: Endpoint<'_>,
    path: &str,
    body: &B,
    what: &str,
) -> Result<Response, SourceError> {
    let response = request(client, Method::POST, endpoint, path)
        .json(body)
        .send()
        .await?;
    check(response, what).await
}

/// Fetch every rating of one kind.
pub async fn get_ratings(
    client: &Client,
    endpoint: Endpoint<'_>,
    kind: RatingKind,
) -> Result<Vec<RemoteRating>, SourceError> {
    let path = format!("/sync/ratings/{}", kind.plural());
    let items: Vec<TraktRatingItem> = get_json(client, endpoint, &path, "fetch ratings").await?;

    let mut ratings = Vec::with_capacity(items.len());
    for item in items {
        let (trakt_id, season_number, episode_number) = match item.item_type.as_str() {
            "show" => (item.show.and_then(|s| s.ids.trakt), None, None),
            "movie" => (item.movie.and_then(|m| m.ids.trakt), None, None),
            "season" => match item.season {
                Some(season) => (season.ids.trakt, Some(season.number), None),
                None => continue,
            },
            "episode" => match item.episode {
                Some(episode) => (episode.ids.trakt, Some(episode.season), Some(episode.number)),
                None => continue,
            },
            _ => continue,
        };
        ratings.push(RemoteRating {
            trakt_id,
            kind,
            rating: item.rating,
            rated_at: item.rated_at,
            season_number,
            episode_number,
        });
    }

    debug!(kind = %kind, count = ratings.len(), "Fetched Trakt ratings");
    Ok(ratings)
}

pub async fn set_ratings(
    client: &Client,
    endpoint: Endpoint<'_>,
    ratings: &RatingRequest,
) -> Result<(), SourceError> {
    post_json(client, endpoint, "/sync/ratings", ratings, "set ratings").await?;
    Ok(())
}

pub async fn remove_rating(
    client: &Client,
    endpoint: Endpoint<'_>,
    kind: RatingKind,
    trakt_id: TraktId,
) -> Result<(), SourceError> {
    let mut payload = serde_json::Map::new();
    payload.insert(
        kind.plural().to_string(),
        serde_json::json!([{ "ids": { "trakt": trakt_id } }]),
    );
    post_json(client, endpoint, "/sync/ratings/remove", &payload, "remove rating").await?;
    Ok(())
}

/// Every season of a show with its episodes.
pub async fn get_seasons(
    client: &Client,
    endpoint: Endpoint<'_>,
    show_id: TraktId,
) -> Result<Vec<RemoteSeason>, SourceError> {
    let path = format!("/shows/{}/seasons?extended=episodes", show_id);
    let seasons: Vec<TraktSeason> = get_json(client, endpoint, &path, "fetch seasons").await?;

    Ok(seasons
        .into_iter()
        .filter_map(|season| {
            let episodes = season
                .episodes
                .into_iter()
                .filter_map(|episode| {
                    Some(RemoteEpisode {
                        trakt_id: episode.ids.trakt?,
                        season_number: episode.season,
                        episode_number: episode.number,
                        title: episode.title,
                    })
                })
                .collect();
            Some(RemoteSeason {
                trakt_id: season.ids.trakt?,
                season_number: season.number,
                episodes,
            })
        })
        .collect())
}

pub async fn get_details(
    client: &Client,
    endpoint: Endpoint<'_>,
    media: MediaKind,
    trakt_id: TraktId,
) -> Result<MediaDetails, SourceError> {
    let path = format!("/{}/{}", media.plural(), trakt_id);
    let item: TraktMedia = get_json(client, endpoint, &path, "fetch details").await?;
    to_details(item).ok_or_else(|| SourceError::Decode(format!("{} {} has no trakt id", media, trakt_id)))
}

pub async fn get_watched(
    client: &Client,
    endpoint: Endpoint<'_>,
    media: MediaKind,
) -> Result<Vec<RemoteWatched>, SourceError> {
    let path = format!("/sync/watched/{}", media.plural());
    let items: Vec<TraktWatchedItem> = get_json(client, endpoint, &path, "fetch watched").await?;

    let mut watched = Vec::with_capacity(items.len());
    for item in items {
        let entity = match media {
            MediaKind::Show => item.show,
            MediaKind::Movie => item.movie,
        };
        let Some(details) = entity.and_then(to_details) else {
            continue;
        };
        let episodes = item
            .seasons
            .iter()
            .flat_map(|season| {
                season.episodes.iter().map(move |episode| WatchedEpisode {
                    season_number: season.number,
                    episode_number: episode.number,
                    watched_at: episode.last_watched_at.as_deref().and_then(parse_date),
                })
            })
            .collect();
        watched.push(RemoteWatched {
            media: details,
            last_watched_at: item.last_watched_at.as_deref().and_then(parse_date),
            episodes,
        });
    }
    Ok(watched)
}

pub async fn get_watchlist(
    client: &Client,
    endpoint: Endpoint<'_>,
    media: MediaKind,
) -> Result<Vec<RemoteWatchlistItem>, SourceError> {
    let path = format!("/sync/watchlist/{}?sort=added,asc", media.plural());
    let items: Vec<TraktWatchlistItem> = get_json(client, endpoint, &path, "fetch watchlist").await?;

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let entity = match media {
                MediaKind::Show => item.show,
                MediaKind::Movie => item.movie,
            };
            Some(RemoteWatchlistItem {
                media: entity.and_then(to_details)?,
                listed_at: item.listed_at.as_deref().and_then(parse_date),
            })
        })
        .collect())
}

pub async fn add_to_history(
    client: &Client,
    endpoint: Endpoint<'_>,
    items: &SyncItemsRequest,
) -> Result<(), SourceError> {
    post_json(client, endpoint, "/sync/history", items, "add watch history").await?;
    Ok(())
}

pub async fn add_to_watchlist(
    client: &Client,
    endpoint: Endpoint<'_>,
    items: &SyncItemsRequest,
) -> Result<(), SourceError> {
    post_json(client, endpoint, "/sync/watchlist", items, "add to watchlist").await?;
    Ok(())
}

fn to_remote_list(list: TraktList) -> Option<RemoteCustomList> {
    Some(RemoteCustomList {
        trakt_id: list.ids.trakt?,
        slug: list.ids.slug.unwrap_or_default(),
        name: list.name,
        description: list.description,
        privacy: list.privacy.unwrap_or_else(|| "private".to_string()),
        item_count: list.item_count.unwrap_or(0),
        created_at: list.created_at.as_deref().and_then(parse_date),
        updated_at: list.updated_at.as_deref().and_then(parse_date),
    })
}

pub async fn get_lists(
    client: &Client,
    endpoint: Endpoint<'_>,
) -> Result<Vec<RemoteCustomList>, SourceError> {
    let lists: Vec<TraktList> = get_json(client, endpoint, "/users/me/lists", "fetch lists").await?;
    Ok(lists.into_iter().filter_map(to_remote_list).collect())
}

pub async fn get_list_items(
    client: &Client,
    endpoint: Endpoint<'_>,
    list_id: TraktId,
) -> Result<Vec<RemoteListEntry>, SourceError> {
    let path = format!("/users/me/lists/{}/items", list_id);
    let items: Vec<TraktListItem> = get_json(client, endpoint, &path, "fetch list items").await?;

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let (kind, entity) = match item.item_type.as_str() {
                "show" => (MediaKind::Show, item.show),
                "movie" => (MediaKind::Movie, item.movie),
                _ => return None,
            };
            Some(RemoteListEntry {
                media: entity.and_then(to_details)?,
                kind,
                rank: item.rank.unwrap_or(index as i64),
                listed_at: item.listed_at.as_deref().and_then(parse_date),
            })
        })
        .collect())
}

pub async fn create_list(
    client: &Client,
    endpoint: Endpoint<'_>,
    name: &str,
    description: Option<&str>,
    privacy: &str,
) -> Result<RemoteCustomList, SourceError> {
    let payload = serde_json::json!({
        "name": name,
        "description": description,
        "privacy": privacy,
    });
    let response = post_json(client, endpoint, "/users/me/lists", &payload, "create list").await?;
    let list: TraktList = response.json().await?;
    to_remote_list(list).ok_or_else(|| SourceError::Decode("created list has no trakt id".to_string()))
}

pub async fn add_list_items(
    client: &Client,
    endpoint: Endpoint<'_>,
    list_id: TraktId,
    items: &SyncItemsRequest,
) -> Result<(), SourceError> {
    let path = format!("/users/me/lists/{}/items", list_id);
    post_json(client, endpoint, &path, items, "add list items").await?;
    Ok(())
}
