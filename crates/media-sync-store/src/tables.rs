use chrono::{DateTime, Utc};
use media_sync_models::{
    CollectionKind, CollectionRecord, CustomList, CustomListItem, EpisodeRecord, MediaDetails,
    MediaKind, RatingKind, RatingRecord, SeasonRecord, TmdbId, TraktId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::table::{IdSet, Journaled, Keyed, Table};

impl Keyed for MediaDetails {
    type Key = TraktId;
    const TABLE: &'static str = "details";

    fn key(&self) -> TraktId {
        self.trakt_id
    }
}

impl Keyed for CollectionRecord {
    type Key = TraktId;
    const TABLE: &'static str = "collection";

    fn key(&self) -> TraktId {
        self.trakt_id
    }
}

impl Keyed for SeasonRecord {
    type Key = TraktId;
    const TABLE: &'static str = "seasons";

    fn key(&self) -> TraktId {
        self.trakt_id
    }
}

impl Keyed for EpisodeRecord {
    type Key = TraktId;
    const TABLE: &'static str = "episodes";

    fn key(&self) -> TraktId {
        self.trakt_id
    }
}

impl Keyed for RatingRecord {
    type Key = (RatingKind, TraktId);
    const TABLE: &'static str = "ratings";

    fn key(&self) -> (RatingKind, TraktId) {
        (self.kind, self.trakt_id)
    }
}

impl Keyed for CustomList {
    type Key = i64;
    const TABLE: &'static str = "custom_lists";

    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for CustomListItem {
    type Key = i64;
    const TABLE: &'static str = "custom_list_items";

    fn key(&self) -> i64 {
        self.id
    }
}

/// Every table of the local store.
///
/// Reads and single writes go through `LocalStore::read`/`write`; multi-table
/// writes that must land together go through `LocalStore::transaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    pub shows: Table<MediaDetails>,
    pub movies: Table<MediaDetails>,

    pub my_shows: Table<CollectionRecord>,
    pub watchlist_shows: Table<CollectionRecord>,
    pub hidden_shows: Table<CollectionRecord>,
    pub my_movies: Table<CollectionRecord>,
    pub watchlist_movies: Table<CollectionRecord>,
    pub hidden_movies: Table<CollectionRecord>,

    pub seasons: Table<SeasonRecord>,
    pub episodes: Table<EpisodeRecord>,
    pub ratings: Table<RatingRecord>,

    pub custom_lists: Table<CustomList>,
    pub custom_list_items: Table<CustomListItem>,

    pub pinned_shows: IdSet<TraktId>,
    pub pinned_movies: IdSet<TraktId>,
    pub on_hold_shows: IdSet<TraktId>,

    // Export bookkeeping for quick sync
    pub exported_movies: IdSet<TraktId>,
    pub exported_list_items: IdSet<i64>,

    next_list_id: i64,
    next_list_item_id: i64,
    #[serde(skip)]
    saved_ids: Option<(i64, i64)>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    fn journaled(&mut self) -> [&mut dyn Journaled; 18] {
        [
            &mut self.shows,
            &mut self.movies,
            &mut self.my_shows,
            &mut self.watchlist_shows,
            &mut self.hidden_shows,
            &mut self.my_movies,
            &mut self.watchlist_movies,
            &mut self.hidden_movies,
            &mut self.seasons,
            &mut self.episodes,
            &mut self.ratings,
            &mut self.custom_lists,
            &mut self.custom_list_items,
            &mut self.pinned_shows,
            &mut self.pinned_movies,
            &mut self.on_hold_shows,
            &mut self.exported_movies,
            &mut self.exported_list_items,
        ]
    }

    /// Start remembering changes so they can be undone.
    pub(crate) fn begin(&mut self) {
        self.saved_ids = Some((self.next_list_id, self.next_list_item_id));
        for table in self.journaled() {
            table.begin();
        }
    }

    pub(crate) fn commit(&mut self) {
        self.saved_ids = None;
        for table in self.journaled() {
            table.commit();
        }
    }

    /// Undo every change since `begin`.
    pub(crate) fn rollback(&mut self) {
        if let Some((list_id, list_item_id)) = self.saved_ids.take() {
            self.next_list_id = list_id;
            self.next_list_item_id = list_item_id;
        }
        for table in self.journaled() {
            table.rollback();
        }
    }

    // Details

    pub fn details(&self, media: MediaKind) -> &Table<MediaDetails> {
        match media {
            MediaKind::Show => &self.shows,
            MediaKind::Movie => &self.movies,
        }
    }

    pub fn details_mut(&mut self, media: MediaKind) -> &mut Table<MediaDetails> {
        match media {
            MediaKind::Show => &mut self.shows,
            MediaKind::Movie => &mut self.movies,
        }
    }

    /// Batched trakt id to tmdb id lookup. Unknown ids are left out of the map.
    pub fn tmdb_ids_for(&self, media: MediaKind, ids: &[TraktId]) -> HashMap<TraktId, TmdbId> {
        let details = self.details(media);
        ids.iter()
            .filter_map(|id| details.get(id).map(|d| (*id, d.tmdb_id)))
            .collect()
    }

    // Collections

    pub fn collection(&self, media: MediaKind, kind: CollectionKind) -> &Table<CollectionRecord> {
        match (media, kind) {
            (MediaKind::Show, CollectionKind::History) => &self.my_shows,
            (MediaKind::Show, CollectionKind::Watchlist) => &self.watchlist_shows,
            (MediaKind::Show, CollectionKind::Hidden) => &self.hidden_shows,
            (MediaKind::Movie, CollectionKind::History) => &self.my_movies,
            (MediaKind::Movie, CollectionKind::Watchlist) => &self.watchlist_movies,
            (MediaKind::Movie, CollectionKind::Hidden) => &self.hidden_movies,
        }
    }

    pub fn collection_mut(
        &mut self,
        media: MediaKind,
        kind: CollectionKind,
    ) -> &mut Table<CollectionRecord> {
        match (media, kind) {
            (MediaKind::Show, CollectionKind::History) => &mut self.my_shows,
            (MediaKind::Show, CollectionKind::Watchlist) => &mut self.watchlist_shows,
            (MediaKind::Show, CollectionKind::Hidden) => &mut self.hidden_shows,
            (MediaKind::Movie, CollectionKind::History) => &mut self.my_movies,
            (MediaKind::Movie, CollectionKind::Watchlist) => &mut self.watchlist_movies,
            (MediaKind::Movie, CollectionKind::Hidden) => &mut self.hidden_movies,
        }
    }

    /// The collection an entity currently belongs to, if any.
    pub fn membership(&self, media: MediaKind, id: TraktId) -> Option<CollectionKind> {
        CollectionKind::ALL
            .into_iter()
            .find(|kind| self.collection(media, *kind).exists(&id))
    }

    /// Ids present in any of history, watchlist or hidden.
    pub fn collection_ids(&self, media: MediaKind) -> HashSet<TraktId> {
        CollectionKind::ALL
            .into_iter()
            .flat_map(|kind| self.collection(media, kind).iter().map(|r| r.trakt_id))
            .collect()
    }

    /// Put an entity into one collection, taking it out of the other two.
    pub fn set_membership(
        &mut self,
        media: MediaKind,
        kind: CollectionKind,
        record: CollectionRecord,
    ) {
        for other in CollectionKind::ALL.into_iter().filter(|k| *k != kind) {
            self.collection_mut(media, other).delete(&record.trakt_id);
        }
        self.collection_mut(media, kind).upsert(record);
    }

    // Progress

    pub fn episodes_for_show(&self, show_id: TraktId) -> Vec<EpisodeRecord> {
        self.episodes
            .iter()
            .filter(|e| e.show_trakt_id == show_id)
            .cloned()
            .collect()
    }

    pub fn watched_episode_ids(&self, show_ids: &[TraktId]) -> HashSet<TraktId> {
        self.episodes
            .iter()
            .filter(|e| e.is_watched && show_ids.contains(&e.show_trakt_id))
            .map(|e| e.trakt_id)
            .collect()
    }

    pub fn watched_season_ids(&self, show_ids: &[TraktId]) -> HashSet<TraktId> {
        self.seasons
            .iter()
            .filter(|s| s.is_watched && show_ids.contains(&s.show_trakt_id))
            .map(|s| s.trakt_id)
            .collect()
    }

    /// Mark an episode watched. Never un-marks: returns false when the episode
    /// is missing or already watched. The owning season flips to watched once
    /// all of its episodes are watched.
    pub fn mark_episode_watched(
        &mut self,
        episode_id: TraktId,
        watched_at: Option<DateTime<Utc>>,
    ) -> bool {
        let season_id = match self.episodes.get_mut(&episode_id) {
            Some(episode) if !episode.is_watched => {
                episode.is_watched = true;
                episode.last_watched_at = Some(watched_at.unwrap_or_else(Utc::now));
                episode.season_trakt_id
            }
            _ => return false,
        };

        let season_episodes: Vec<&EpisodeRecord> = self
            .episodes
            .iter()
            .filter(|e| e.season_trakt_id == season_id)
            .collect();
        let all_watched = season_episodes.iter().all(|e| e.is_watched);
        let watched_count = season_episodes.len() as u32;

        if let Some(season) = self.seasons.get_mut(&season_id) {
            if all_watched && watched_count >= season.episode_count {
                season.is_watched = true;
            }
        }
        true
    }

    /// Watched episodes not yet pushed to the remote history.
    pub fn pending_episode_exports(&self) -> Vec<EpisodeRecord> {
        self.episodes
            .iter()
            .filter(|e| e.is_export_pending())
            .cloned()
            .collect()
    }

    pub fn mark_episodes_exported(&mut self, ids: &[TraktId], at: DateTime<Utc>) {
        for id in ids {
            if let Some(episode) = self.episodes.get_mut(id) {
                episode.last_exported_at = Some(at);
            }
        }
    }

    /// Watched movies not yet pushed to the remote history.
    pub fn pending_movie_exports(&self) -> Vec<CollectionRecord> {
        self.my_movies
            .iter()
            .filter(|m| !self.exported_movies.contains(&m.trakt_id))
            .cloned()
            .collect()
    }

    // Ratings

    /// Ratings of one kind, most recently rated first.
    pub fn ratings_by_kind(&self, kind: RatingKind) -> Vec<RatingRecord> {
        let mut ratings: Vec<RatingRecord> = self
            .ratings
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));
        ratings
    }

    pub fn ratings_by_kind_and_ids(&self, kind: RatingKind, ids: &[TraktId]) -> Vec<RatingRecord> {
        let keys: Vec<(RatingKind, TraktId)> = ids.iter().map(|id| (kind, *id)).collect();
        let mut ratings = self.ratings.get_all_by_ids(&keys);
        ratings.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));
        ratings
    }

    /// Delete every rating of `kind` whose id is among the new rows, then insert the rows.
    pub fn replace_ratings(
        &mut self,
        kind: RatingKind,
        ratings: Vec<RatingRecord>,
    ) -> Result<(), StoreError> {
        let ids: HashSet<TraktId> = ratings.iter().map(|r| r.trakt_id).collect();
        self.ratings
            .delete_where(|r| r.kind == kind && ids.contains(&r.trakt_id));
        self.ratings.insert_all(ratings)
    }

    pub fn replace_rating(&mut self, rating: RatingRecord) -> Result<(), StoreError> {
        self.ratings.delete(&(rating.kind, rating.trakt_id));
        self.ratings.insert(rating)
    }

    pub fn delete_rating(&mut self, kind: RatingKind, id: TraktId) -> bool {
        self.ratings.delete(&(kind, id)).is_some()
    }

    // Custom lists

    /// Insert a list, assigning its local id.
    pub fn insert_list(&mut self, mut list: CustomList) -> Result<i64, StoreError> {
        let next = self
            .custom_lists
            .iter()
            .map(|l| l.id)
            .max()
            .unwrap_or(0)
            .max(self.next_list_id)
            + 1;
        self.next_list_id = next;
        list.id = next;
        self.custom_lists.insert(list)?;
        Ok(next)
    }

    /// Insert a list keeping its id, as read from a backup.
    pub fn restore_list(&mut self, list: CustomList) -> Result<i64, StoreError> {
        let id = list.id;
        self.custom_lists.insert(list)?;
        self.next_list_id = self.next_list_id.max(id);
        Ok(id)
    }

    /// Items of a list in display order.
    pub fn list_items(&self, list_id: i64) -> Vec<CustomListItem> {
        let mut items: Vec<CustomListItem> = self
            .custom_list_items
            .iter()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.rank, i.id));
        items
    }

    /// Items of a list not yet pushed to the remote list.
    pub fn pending_list_items(&self, list_id: i64) -> Vec<CustomListItem> {
        self.list_items(list_id)
            .into_iter()
            .filter(|i| !self.exported_list_items.contains(&i.id))
            .collect()
    }

    /// Append an item at the end of a list. Returns `None` if the list already
    /// holds this (trakt id, kind) pair.
    pub fn add_to_list(
        &mut self,
        list_id: i64,
        trakt_id: TraktId,
        kind: MediaKind,
        listed_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<i64>, StoreError> {
        if !self.custom_lists.exists(&list_id) {
            return Err(StoreError::MissingRow {
                table: CustomList::TABLE,
                key: list_id.to_string(),
            });
        }

        let items = self.list_items(list_id);
        if items.iter().any(|i| i.trakt_id == trakt_id && i.kind == kind) {
            return Ok(None);
        }

        let rank = items.last().map(|i| i.rank + 1).unwrap_or(0);
        let id = self
            .custom_list_items
            .iter()
            .map(|i| i.id)
            .max()
            .unwrap_or(0)
            .max(self.next_list_item_id)
            + 1;
        self.next_list_item_id = id;

        self.custom_list_items.insert(CustomListItem {
            id,
            list_id,
            trakt_id,
            kind,
            rank,
            listed_at,
            created_at,
            updated_at,
        })?;

        if let Some(list) = self.custom_lists.get_mut(&list_id) {
            list.item_count = items.len() as u64 + 1;
            list.updated_at = updated_at;
        }
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: TraktId) -> CollectionRecord {
        CollectionRecord {
            trakt_id: id,
            tmdb_id: id * 10,
            title: format!("Title {}", id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn episode(id: TraktId, season: TraktId, number: u32, watched: bool) -> EpisodeRecord {
        EpisodeRecord {
            trakt_id: id,
            season_trakt_id: season,
            show_trakt_id: 1,
            show_tmdb_id: 10,
            season_number: 1,
            episode_number: number,
            is_watched: watched,
            last_watched_at: None,
            last_exported_at: None,
        }
    }

    fn rating(id: TraktId, kind: RatingKind, value: u8) -> RatingRecord {
        RatingRecord::new(id, kind, value, Utc::now())
    }

    #[test]
    fn test_set_membership_is_exclusive() {
        let mut tables = Tables::new();
        tables.set_membership(MediaKind::Show, CollectionKind::Watchlist, record(1));
        tables.set_membership(MediaKind::Show, CollectionKind::History, record(1));

        assert_eq!(tables.membership(MediaKind::Show, 1), Some(CollectionKind::History));
        assert!(tables.watchlist_shows.is_empty());
        assert_eq!(tables.collection_ids(MediaKind::Show).len(), 1);
        assert_eq!(tables.membership(MediaKind::Movie, 1), None);
    }

    #[test]
    fn test_mark_episode_watched_is_monotonic() {
        let mut tables = Tables::new();
        tables.seasons.upsert(SeasonRecord {
            trakt_id: 100,
            show_trakt_id: 1,
            season_number: 1,
            episode_count: 2,
            is_watched: false,
        });
        tables.episodes.upsert(episode(1, 100, 1, false));
        tables.episodes.upsert(episode(2, 100, 2, true));

        assert!(tables.mark_episode_watched(1, None));
        assert!(!tables.mark_episode_watched(1, None));
        assert!(!tables.mark_episode_watched(99, None));
        assert!(tables.seasons.get(&100).unwrap().is_watched);
    }

    #[test]
    fn test_replace_ratings_scoped_by_kind_and_ids() {
        let mut tables = Tables::new();
        tables.ratings.upsert(rating(1, RatingKind::Show, 5));
        tables.ratings.upsert(rating(2, RatingKind::Show, 6));
        tables.ratings.upsert(rating(1, RatingKind::Movie, 7));

        tables
            .replace_ratings(RatingKind::Show, vec![rating(1, RatingKind::Show, 9)])
            .unwrap();

        assert_eq!(tables.ratings.get(&(RatingKind::Show, 1)).unwrap().rating, 9);
        assert_eq!(tables.ratings.get(&(RatingKind::Show, 2)).unwrap().rating, 6);
        assert_eq!(tables.ratings.get(&(RatingKind::Movie, 1)).unwrap().rating, 7);
        assert_eq!(tables.ratings.len(), 3);
    }

    #[test]
    fn test_add_to_list_dedupes_and_ranks() {
        let mut tables = Tables::new();
        let list_id = tables.insert_list(CustomList::create("Faves", None)).unwrap();
        let now = Utc::now();

        let first = tables.add_to_list(list_id, 5, MediaKind::Show, now, now, now).unwrap();
        let second = tables.add_to_list(list_id, 5, MediaKind::Movie, now, now, now).unwrap();
        let duplicate = tables.add_to_list(list_id, 5, MediaKind::Show, now, now, now).unwrap();

        assert!(first.is_some());
        assert!(second.is_some());
        assert!(duplicate.is_none());
        let items = tables.list_items(list_id);
        assert_eq!(items.len(), 2);
        assert!(items[0].rank < items[1].rank);
        assert_eq!(tables.custom_lists.get(&list_id).unwrap().item_count, 2);
    }

    #[test]
    fn test_add_to_missing_list_fails() {
        let mut tables = Tables::new();
        let now = Utc::now();
        let err = tables.add_to_list(42, 1, MediaKind::Show, now, now, now).unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { .. }));
    }

    #[test]
    fn test_restore_list_keeps_id() {
        let mut tables = Tables::new();
        let mut list = CustomList::create("Restored", None);
        list.id = 7;
        assert_eq!(tables.restore_list(list.clone()).unwrap(), 7);
        assert!(matches!(tables.restore_list(list), Err(StoreError::Conflict { .. })));

        let next = tables.insert_list(CustomList::create("Fresh", None)).unwrap();
        assert_eq!(next, 8);
    }

    #[test]
    fn test_pending_exports() {
        let mut tables = Tables::new();
        tables.episodes.upsert(episode(1, 100, 1, true));
        tables.episodes.upsert(episode(2, 100, 2, false));
        tables.set_membership(MediaKind::Movie, CollectionKind::History, record(5));
        tables.set_membership(MediaKind::Movie, CollectionKind::History, record(6));
        tables.exported_movies.insert(6);

        let pending: Vec<TraktId> = tables.pending_episode_exports().iter().map(|e| e.trakt_id).collect();
        assert_eq!(pending, vec![1]);
        let movies: Vec<TraktId> = tables.pending_movie_exports().iter().map(|m| m.trakt_id).collect();
        assert_eq!(movies, vec![5]);

        tables.mark_episodes_exported(&[1], Utc::now());
        assert!(tables.pending_episode_exports().is_empty());
    }

    #[test]
    fn test_tmdb_ids_for() {
        let mut tables = Tables::new();
        tables.shows.upsert(MediaDetails {
            trakt_id: 1,
            tmdb_id: 11,
            title: "A".to_string(),
            year: None,
        });
        let ids = tables.tmdb_ids_for(MediaKind::Show, &[1, 2]);
        assert_eq!(ids.get(&1), Some(&11));
        assert_eq!(ids.get(&2), None);
    }
}
