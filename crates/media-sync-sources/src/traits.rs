use async_trait::async_trait;
use media_sync_models::{MediaDetails, MediaKind, RatingKind, TraktId};

use crate::error::SourceError;
use crate::types::{
    RatingRequest, RemoteCustomList, RemoteListEntry, RemoteRating, RemoteSeason, RemoteWatched,
    RemoteWatchlistItem, SyncItemsRequest,
};

/// The remote tracking service. Stateless: every call goes over the wire.
///
/// Any call may fail with `SourceError::Unauthorized` or
/// `SourceError::AccountLimits`; detail fetches may fail with
/// `SourceError::NotFound`.
#[async_trait]
pub trait RemoteService: Send + Sync {
    fn service_name(&self) -> &str;

    // Ratings
    async fn fetch_ratings(&self, kind: RatingKind) -> Result<Vec<RemoteRating>, SourceError>;
    async fn post_ratings(&self, request: &RatingRequest) -> Result<(), SourceError>;
    async fn post_rating(
        &self,
        kind: RatingKind,
        trakt_id: TraktId,
        rating: u8,
        rated_at: &str,
    ) -> Result<(), SourceError>;
    async fn delete_rating(&self, kind: RatingKind, trakt_id: TraktId) -> Result<(), SourceError>;

    // Entities
    async fn fetch_seasons(&self, show_id: TraktId) -> Result<Vec<RemoteSeason>, SourceError>;
    async fn fetch_details(
        &self,
        media: MediaKind,
        trakt_id: TraktId,
    ) -> Result<MediaDetails, SourceError>;

    // Collections
    async fn fetch_watched(&self, media: MediaKind) -> Result<Vec<RemoteWatched>, SourceError>;
    async fn fetch_watchlist(
        &self,
        media: MediaKind,
    ) -> Result<Vec<RemoteWatchlistItem>, SourceError>;
    async fn post_history(&self, request: &SyncItemsRequest) -> Result<(), SourceError>;
    async fn post_watchlist(&self, request: &SyncItemsRequest) -> Result<(), SourceError>;

    // Custom lists
    async fn fetch_lists(&self) -> Result<Vec<RemoteCustomList>, SourceError>;
    async fn fetch_list_items(&self, list_id: TraktId) -> Result<Vec<RemoteListEntry>, SourceError>;
    async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
        privacy: &str,
    ) -> Result<RemoteCustomList, SourceError>;
    async fn post_list_items(
        &self,
        list_id: TraktId,
        request: &SyncItemsRequest,
    ) -> Result<(), SourceError>;
}
