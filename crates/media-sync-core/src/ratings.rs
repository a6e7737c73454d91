//! Rating reconciliation between the local store and the remote service.
//!
//! Conflicts resolve last-write-wins on the rated-at timestamp, compared at
//! whole-second precision. [`should_import`] and [`should_export`] are mirror
//! images: for one entity at most one of them holds, and neither does when
//! both sides were rated in the same second.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use media_sync_models::{RatingKind, RatingRecord, TraktId};
use media_sync_sources::{RemoteRating, RemoteService};
use media_sync_store::LocalStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cancel;
use crate::dates::{format_date, truncate_to_seconds};
use crate::error::SyncError;

/// Batch size for id-filtered rating reads.
pub const CHUNK_SIZE: usize = 250;

pub const MAX_RATING: u8 = 10;

/// Accept a remote rating when there is no local one or the local one is older.
pub fn should_import(
    local_rated_at: Option<DateTime<Utc>>,
    remote_rated_at: DateTime<Utc>,
) -> bool {
    match local_rated_at {
        None => true,
        Some(local) => truncate_to_seconds(local) < truncate_to_seconds(remote_rated_at),
    }
}

/// Push a local rating when the remote has none, its date cannot be read, or
/// the local one is newer.
pub fn should_export(local_rated_at: DateTime<Utc>, remote: Option<&RemoteRating>) -> bool {
    match remote.map(RemoteRating::rated_at) {
        None | Some(None) => true,
        Some(Some(remote_at)) => truncate_to_seconds(local_rated_at) > truncate_to_seconds(remote_at),
    }
}

/// The entity a rating is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatedEntity {
    pub kind: RatingKind,
    pub trakt_id: TraktId,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl RatedEntity {
    pub fn show(trakt_id: TraktId) -> Self {
        Self::plain(RatingKind::Show, trakt_id)
    }

    pub fn movie(trakt_id: TraktId) -> Self {
        Self::plain(RatingKind::Movie, trakt_id)
    }

    pub fn season(trakt_id: TraktId, season_number: u32) -> Self {
        Self {
            season_number: Some(season_number),
            ..Self::plain(RatingKind::Season, trakt_id)
        }
    }

    pub fn episode(trakt_id: TraktId, season_number: u32, episode_number: u32) -> Self {
        Self {
            season_number: Some(season_number),
            episode_number: Some(episode_number),
            ..Self::plain(RatingKind::Episode, trakt_id)
        }
    }

    fn plain(kind: RatingKind, trakt_id: TraktId) -> Self {
        Self {
            kind,
            trakt_id,
            season_number: None,
            episode_number: None,
        }
    }
}

pub struct RatingsRepository {
    store: LocalStore,
    remote: Arc<dyn RemoteService>,
    movies_enabled: bool,
}

impl RatingsRepository {
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteService>, movies_enabled: bool) -> Self {
        Self {
            store,
            remote,
            movies_enabled,
        }
    }

    /// Kinds taking part in sync. Movies drop out when the feature is off.
    pub fn enabled_kinds(&self) -> Vec<RatingKind> {
        RatingKind::ALL
            .into_iter()
            .filter(|k| *k != RatingKind::Movie || self.movies_enabled)
            .collect()
    }

    /// Merge remote ratings of `kinds` into the local store, all kinds at once.
    ///
    /// Each kind fails on its own: an error in one is logged and the others
    /// still complete. Cancellation and unauthorized errors are returned once
    /// every kind has finished, since they concern the whole run.
    pub async fn preload(
        &self,
        kinds: &[RatingKind],
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let results = join_all(
            kinds
                .iter()
                .map(|kind| cancel::cancellable(cancel, self.preload_kind(*kind))),
        )
        .await;

        let mut imported = 0;
        let mut fatal: Option<SyncError> = None;
        for (kind, result) in kinds.iter().zip(results) {
            match result {
                Ok(count) => imported += count,
                Err(e) if e.is_cancelled() || e.is_unauthorized() => {
                    if !matches!(fatal, Some(SyncError::Cancelled)) {
                        fatal = Some(e);
                    }
                }
                Err(e) => error!(kind = %kind, "Failed to preload ratings: {}", e),
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(imported),
        }
    }

    async fn preload_kind(&self, kind: RatingKind) -> Result<usize, SyncError> {
        let remote = self.remote.fetch_ratings(kind).await?;
        let local: HashMap<TraktId, DateTime<Utc>> = self
            .store
            .read(|t| {
                t.ratings_by_kind(kind)
                    .into_iter()
                    .map(|r| (r.trakt_id, r.rated_at))
                    .collect()
            })
            .await;

        let accepted: Vec<RatingRecord> = remote
            .iter()
            .filter_map(|r| {
                let trakt_id = r.trakt_id?;
                let remote_at = r.rated_at()?;
                should_import(local.get(&trakt_id).copied(), remote_at).then(|| {
                    RatingRecord::new(trakt_id, kind, r.rating, remote_at)
                        .with_numbers(r.season_number, r.episode_number)
                })
            })
            .collect();

        if accepted.is_empty() {
            debug!(kind = %kind, remote = remote.len(), "Ratings up to date");
            return Ok(0);
        }

        let count = accepted.len();
        self.store.write(|t| t.replace_ratings(kind, accepted)).await?;
        info!(kind = %kind, imported = count, "Imported remote ratings");
        Ok(count)
    }

    pub async fn load_all(&self, kind: RatingKind) -> Vec<RatingRecord> {
        self.store.read(|t| t.ratings_by_kind(kind)).await
    }

    pub async fn load_by_ids(&self, kind: RatingKind, ids: &[TraktId]) -> Vec<RatingRecord> {
        let mut ratings = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(CHUNK_SIZE) {
            let batch = self.store.read(|t| t.ratings_by_kind_and_ids(kind, chunk)).await;
            ratings.extend(batch);
        }
        ratings
    }

    pub async fn load_one(&self, kind: RatingKind, trakt_id: TraktId) -> Option<RatingRecord> {
        self.store.read(|t| t.ratings.get_by_id(&(kind, trakt_id))).await
    }

    /// Rate an entity. With `with_sync` the remote is written first and a
    /// remote failure leaves the local store untouched.
    pub async fn add_rating(
        &self,
        entity: RatedEntity,
        rating: u8,
        with_sync: bool,
    ) -> Result<RatingRecord, SyncError> {
        if rating > MAX_RATING {
            return Err(SyncError::InvalidRating(rating));
        }

        let now = Utc::now();
        if with_sync {
            self.remote
                .post_rating(entity.kind, entity.trakt_id, rating, &format_date(now))
                .await?;
        }

        let record = RatingRecord::new(entity.trakt_id, entity.kind, rating, now)
            .with_numbers(entity.season_number, entity.episode_number);
        self.store.write(|t| t.replace_rating(record.clone())).await?;
        Ok(record)
    }

    pub async fn delete_rating(
        &self,
        entity: RatedEntity,
        with_sync: bool,
    ) -> Result<bool, SyncError> {
        if with_sync {
            self.remote.delete_rating(entity.kind, entity.trakt_id).await?;
        }
        Ok(self
            .store
            .write(|t| t.delete_rating(entity.kind, entity.trakt_id))
            .await)
    }
}
