//! In-memory remote service for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use media_sync_config::{RetryConfig, SyncOptions};
use media_sync_models::{MediaDetails, MediaKind, RatingKind, TraktId};
use media_sync_sources::{
    RatingRequest, RemoteCustomList, RemoteEpisode, RemoteListEntry, RemoteRating, RemoteSeason,
    RemoteService, RemoteWatched, RemoteWatchlistItem, SourceError, SyncItemsRequest,
};
use media_sync_store::LocalStore;

use crate::context::SyncContext;
use crate::sync::{Notification, SyncEvent, SyncListener};

#[derive(Default)]
pub struct FakeRemote {
    pub ratings: Mutex<HashMap<RatingKind, Vec<RemoteRating>>>,
    pub seasons: Mutex<HashMap<TraktId, Vec<RemoteSeason>>>,
    pub details: Mutex<HashMap<(MediaKind, TraktId), MediaDetails>>,
    pub watched: Mutex<HashMap<MediaKind, Vec<RemoteWatched>>>,
    pub watchlist: Mutex<HashMap<MediaKind, Vec<RemoteWatchlistItem>>>,
    pub lists: Mutex<Vec<RemoteCustomList>>,
    pub list_items: Mutex<HashMap<TraktId, Vec<RemoteListEntry>>>,
    /// Listed by `fetch_lists` but answering 404 for their items.
    pub deleted_lists: Mutex<Vec<TraktId>>,

    pub posted_ratings: Mutex<Vec<RatingRequest>>,
    pub posted_history: Mutex<Vec<SyncItemsRequest>>,
    pub posted_watchlist: Mutex<Vec<SyncItemsRequest>>,
    pub posted_list_items: Mutex<Vec<(TraktId, SyncItemsRequest)>>,
    pub deleted_ratings: Mutex<Vec<(RatingKind, TraktId)>>,

    failures: Mutex<HashMap<&'static str, SourceError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    next_list_id: AtomicI64,
}

impl FakeRemote {
    /// Every following call of `operation` fails with `error`.
    pub fn fail(&self, operation: &'static str, error: SourceError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    fn enter(&self, operation: &'static str) -> Result<(), SourceError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        match self.failures.lock().unwrap().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn with_details(self, media: MediaKind, trakt_id: TraktId, title: &str) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert((media, trakt_id), details(trakt_id, title));
        self
    }

    pub fn with_seasons(self, show_id: TraktId, episodes_per_season: &[u32]) -> Self {
        let seasons = episodes_per_season
            .iter()
            .enumerate()
            .map(|(i, count)| season(show_id, i as u32 + 1, *count))
            .collect();
        self.seasons.lock().unwrap().insert(show_id, seasons);
        self
    }

    pub fn with_ratings(self, kind: RatingKind, ratings: Vec<RemoteRating>) -> Self {
        self.ratings.lock().unwrap().insert(kind, ratings);
        self
    }
}

pub fn details(trakt_id: TraktId, title: &str) -> MediaDetails {
    MediaDetails {
        trakt_id,
        tmdb_id: trakt_id * 10,
        title: title.to_string(),
        year: Some(2020),
    }
}

pub fn season_id(show_id: TraktId, number: u32) -> TraktId {
    show_id * 100 + number as i64
}

pub fn episode_id(show_id: TraktId, season: u32, number: u32) -> TraktId {
    show_id * 10_000 + season as i64 * 100 + number as i64
}

pub fn season(show_id: TraktId, number: u32, episode_count: u32) -> RemoteSeason {
    RemoteSeason {
        trakt_id: season_id(show_id, number),
        season_number: number,
        episodes: (1..=episode_count)
            .map(|e| RemoteEpisode {
                trakt_id: episode_id(show_id, number, e),
                season_number: number,
                episode_number: e,
                title: None,
            })
            .collect(),
    }
}

pub fn remote_rating(
    kind: RatingKind,
    trakt_id: TraktId,
    rating: u8,
    rated_at: &str,
) -> RemoteRating {
    RemoteRating {
        trakt_id: Some(trakt_id),
        kind,
        rating,
        rated_at: rated_at.to_string(),
        season_number: None,
        episode_number: None,
    }
}

pub fn options() -> SyncOptions {
    SyncOptions {
        retry: RetryConfig::immediate(),
        ..SyncOptions::default()
    }
}

pub fn context(remote: Arc<FakeRemote>) -> SyncContext {
    SyncContext::new(LocalStore::in_memory(), remote, options())
}

#[async_trait]
impl RemoteService for FakeRemote {
    fn service_name(&self) -> &str {
        "fake"
    }

    async fn fetch_ratings(&self, kind: RatingKind) -> Result<Vec<RemoteRating>, SourceError> {
        self.enter("fetch_ratings")?;
        Ok(self.ratings.lock().unwrap().get(&kind).cloned().unwrap_or_default())
    }

    async fn post_ratings(&self, request: &RatingRequest) -> Result<(), SourceError> {
        self.enter("post_ratings")?;
        self.posted_ratings.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn post_rating(
        &self,
        kind: RatingKind,
        trakt_id: TraktId,
        rating: u8,
        rated_at: &str,
    ) -> Result<(), SourceError> {
        self.enter("post_rating")?;
        let mut ratings = self.ratings.lock().unwrap();
        let bucket = ratings.entry(kind).or_default();
        bucket.retain(|r| r.trakt_id != Some(trakt_id));
        bucket.push(remote_rating(kind, trakt_id, rating, rated_at));
        Ok(())
    }

    async fn delete_rating(&self, kind: RatingKind, trakt_id: TraktId) -> Result<(), SourceError> {
        self.enter("delete_rating")?;
        self.deleted_ratings.lock().unwrap().push((kind, trakt_id));
        Ok(())
    }

    async fn fetch_seasons(&self, show_id: TraktId) -> Result<Vec<RemoteSeason>, SourceError> {
        self.enter("fetch_seasons")?;
        Ok(self.seasons.lock().unwrap().get(&show_id).cloned().unwrap_or_default())
    }

    async fn fetch_details(
        &self,
        media: MediaKind,
        trakt_id: TraktId,
    ) -> Result<MediaDetails, SourceError> {
        self.enter("fetch_details")?;
        self.details
            .lock()
            .unwrap()
            .get(&(media, trakt_id))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("{} {}", media, trakt_id)))
    }

    async fn fetch_watched(&self, media: MediaKind) -> Result<Vec<RemoteWatched>, SourceError> {
        self.enter("fetch_watched")?;
        Ok(self.watched.lock().unwrap().get(&media).cloned().unwrap_or_default())
    }

    async fn fetch_watchlist(
        &self,
        media: MediaKind,
    ) -> Result<Vec<RemoteWatchlistItem>, SourceError> {
        self.enter("fetch_watchlist")?;
        Ok(self.watchlist.lock().unwrap().get(&media).cloned().unwrap_or_default())
    }

    async fn post_history(&self, request: &SyncItemsRequest) -> Result<(), SourceError> {
        self.enter("post_history")?;
        self.posted_history.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn post_watchlist(&self, request: &SyncItemsRequest) -> Result<(), SourceError> {
        self.enter("post_watchlist")?;
        self.posted_watchlist.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn fetch_lists(&self) -> Result<Vec<RemoteCustomList>, SourceError> {
        self.enter("fetch_lists")?;
        Ok(self.lists.lock().unwrap().clone())
    }

    async fn fetch_list_items(
        &self,
        list_id: TraktId,
    ) -> Result<Vec<RemoteListEntry>, SourceError> {
        self.enter("fetch_list_items")?;
        if self.deleted_lists.lock().unwrap().contains(&list_id) {
            return Err(SourceError::NotFound(format!("list {}", list_id)));
        }
        Ok(self.list_items.lock().unwrap().get(&list_id).cloned().unwrap_or_default())
    }

    async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
        privacy: &str,
    ) -> Result<RemoteCustomList, SourceError> {
        self.enter("create_list")?;
        let trakt_id = 9000 + self.next_list_id.fetch_add(1, Ordering::SeqCst);
        let list = RemoteCustomList {
            trakt_id,
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: description.map(str::to_string),
            privacy: privacy.to_string(),
            item_count: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.lists.lock().unwrap().push(list.clone());
        Ok(list)
    }

    async fn post_list_items(
        &self,
        list_id: TraktId,
        request: &SyncItemsRequest,
    ) -> Result<(), SourceError> {
        self.enter("post_list_items")?;
        self.posted_list_items.lock().unwrap().push((list_id, request.clone()));
        Ok(())
    }
}

/// Listener that keeps everything it receives.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<SyncEvent>>,
    pub shown: Mutex<Vec<Notification>>,
    pub dismissed: Mutex<Vec<u32>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn shown_ids(&self) -> Vec<u32> {
        self.shown.lock().unwrap().iter().map(|n| n.id).collect()
    }

    pub fn dismissed(&self) -> Vec<u32> {
        self.dismissed.lock().unwrap().clone()
    }
}

impl SyncListener for RecordingListener {
    fn on_event(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn show_notification(&self, notification: Notification) {
        self.shown.lock().unwrap().push(notification);
    }

    fn dismiss_notification(&self, id: u32) {
        self.dismissed.lock().unwrap().push(id);
    }
}
