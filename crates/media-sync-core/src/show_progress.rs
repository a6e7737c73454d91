//! Seasons and episodes of a show entering the local collection.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use media_sync_models::{
    CollectionKind, CollectionRecord, EpisodeRecord, MediaDetails, MediaKind, SeasonRecord, TraktId,
};
use media_sync_sources::RemoteSeason;
use media_sync_store::{Keyed, StoreError, Tables};

/// Watched (season, episode) pairs known from a remote history or a backup.
#[derive(Debug, Default, Clone)]
pub struct WatchedMarks {
    episodes: HashMap<(u32, u32), Option<DateTime<Utc>>>,
    seasons: Option<HashSet<u32>>, // Explicit watched seasons; derived from episodes when None
    exported: bool,
}

impl WatchedMarks {
    /// Marks coming from the remote history. They are already exported.
    pub fn remote(episodes: impl IntoIterator<Item = (u32, u32, Option<DateTime<Utc>>)>) -> Self {
        Self {
            episodes: episodes.into_iter().map(|(s, e, at)| ((s, e), at)).collect(),
            seasons: None,
            exported: true,
        }
    }

    /// Marks coming from a backup file. A season only counts as watched if
    /// the backup lists it.
    pub fn backup(
        episodes: impl IntoIterator<Item = (u32, u32, Option<DateTime<Utc>>)>,
        seasons: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            episodes: episodes.into_iter().map(|(s, e, at)| ((s, e), at)).collect(),
            seasons: Some(seasons.into_iter().collect()),
            exported: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// `Some(watched_at)` when the episode is marked watched.
    pub fn episode(&self, season: u32, episode: u32) -> Option<Option<DateTime<Utc>>> {
        self.episodes.get(&(season, episode)).copied()
    }

    /// A season is watched when it is listed (if seasons are listed at all)
    /// and every one of its remote episodes is marked.
    pub fn season_watched(&self, season: &RemoteSeason) -> bool {
        if let Some(listed) = &self.seasons {
            if !listed.contains(&season.season_number) {
                return false;
            }
        }
        let marked = self
            .episodes
            .keys()
            .filter(|(s, _)| *s == season.season_number)
            .count() as u32;
        marked > 0 && marked == season.episode_count()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShowProgress {
    pub seasons: Vec<SeasonRecord>,
    pub episodes: Vec<EpisodeRecord>,
}

impl ShowProgress {
    /// Build progress rows from the remote season list, leaving out seasons
    /// and episodes already watched locally.
    pub fn build(
        show: &MediaDetails,
        remote_seasons: &[RemoteSeason],
        marks: &WatchedMarks,
        watched_season_ids: &HashSet<TraktId>,
        watched_episode_ids: &HashSet<TraktId>,
    ) -> Self {
        let now = Utc::now();
        let mut progress = ShowProgress::default();

        for season in remote_seasons {
            if !watched_season_ids.contains(&season.trakt_id) {
                progress.seasons.push(SeasonRecord {
                    trakt_id: season.trakt_id,
                    show_trakt_id: show.trakt_id,
                    season_number: season.season_number,
                    episode_count: season.episode_count(),
                    is_watched: marks.season_watched(season),
                });
            }

            for episode in &season.episodes {
                if watched_episode_ids.contains(&episode.trakt_id) {
                    continue;
                }
                let mark = marks.episode(episode.season_number, episode.episode_number);
                let watched_at = mark.map(|at| at.unwrap_or(now));
                progress.episodes.push(EpisodeRecord {
                    trakt_id: episode.trakt_id,
                    season_trakt_id: season.trakt_id,
                    show_trakt_id: show.trakt_id,
                    show_tmdb_id: show.tmdb_id,
                    season_number: episode.season_number,
                    episode_number: episode.episode_number,
                    is_watched: mark.is_some(),
                    last_watched_at: watched_at,
                    last_exported_at: if marks.exported { watched_at } else { None },
                });
            }
        }
        progress
    }

    pub fn watched_episodes(&self) -> usize {
        self.episodes.iter().filter(|e| e.is_watched).count()
    }

    /// Write seasons, episodes and the collection row. Run inside
    /// `LocalStore::transaction` so that a failure leaves nothing behind.
    pub fn write(
        self,
        tables: &mut Tables,
        kind: CollectionKind,
        record: CollectionRecord,
    ) -> Result<(), StoreError> {
        let show_id = record.trakt_id;
        tables.seasons.upsert_all(self.seasons);
        tables.episodes.upsert_all(self.episodes);

        if !tables.shows.exists(&show_id) {
            return Err(StoreError::MissingRow {
                table: MediaDetails::TABLE,
                key: show_id.to_string(),
            });
        }
        tables.set_membership(MediaKind::Show, kind, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{details, episode_id, season, season_id};
    use media_sync_store::LocalStore;

    fn membership(show_id: TraktId) -> CollectionRecord {
        CollectionRecord {
            trakt_id: show_id,
            tmdb_id: show_id * 10,
            title: "Show".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_backup_season_needs_full_episode_count() {
        let seasons = vec![season(1, 1, 2), season(1, 2, 3)];
        let marks = WatchedMarks::backup([(1, 1, None), (1, 2, None), (2, 1, None)], [1, 2]);

        let progress = ShowProgress::build(&details(1, "Show"), &seasons, &marks, &HashSet::new(), &HashSet::new());

        assert!(progress.seasons[0].is_watched);
        assert!(!progress.seasons[1].is_watched);
        assert_eq!(progress.watched_episodes(), 3);
        assert!(progress.episodes.iter().all(|e| e.last_exported_at.is_none()));
    }

    #[test]
    fn test_unlisted_backup_season_is_not_watched() {
        let seasons = vec![season(1, 1, 1)];
        let marks = WatchedMarks::backup([(1, 1, None)], Vec::new());
        let progress = ShowProgress::build(&details(1, "Show"), &seasons, &marks, &HashSet::new(), &HashSet::new());
        assert!(!progress.seasons[0].is_watched);
        assert!(progress.episodes[0].is_watched);
    }

    #[test]
    fn test_locally_watched_rows_are_left_alone() {
        let seasons = vec![season(1, 1, 2)];
        let watched_seasons = HashSet::from([season_id(1, 1)]);
        let watched_episodes = HashSet::from([episode_id(1, 1, 1)]);

        let progress = ShowProgress::build(
            &details(1, "Show"),
            &seasons,
            &WatchedMarks::default(),
            &watched_seasons,
            &watched_episodes,
        );

        assert!(progress.seasons.is_empty());
        assert_eq!(progress.episodes.len(), 1);
        assert_eq!(progress.episodes[0].trakt_id, episode_id(1, 1, 2));
    }

    #[test]
    fn test_remote_marks_are_not_pending() {
        let at = Utc::now();
        let marks = WatchedMarks::remote([(1, 1, Some(at))]);
        let progress = ShowProgress::build(&details(1, "Show"), &[season(1, 1, 1)], &marks, &HashSet::new(), &HashSet::new());
        assert!(!progress.episodes[0].is_export_pending());
        assert!(progress.seasons[0].is_watched);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let store = LocalStore::in_memory();
        let marks = WatchedMarks::backup([(1, 1, None)], [1]);
        let progress = ShowProgress::build(&details(1, "Show"), &[season(1, 1, 3)], &marks, &HashSet::new(), &HashSet::new());

        // No cached details for show 1, so the membership write fails after
        // seasons and episodes were already written.
        let result = store
            .transaction(|t| progress.write(t, CollectionKind::History, membership(1)))
            .await;

        assert!(matches!(result, Err(StoreError::MissingRow { .. })));
        let (seasons, episodes, shows) = store
            .read(|t| (t.seasons.len(), t.episodes.len(), t.my_shows.len()))
            .await;
        assert_eq!((seasons, episodes, shows), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_write_lands_together() {
        let store = LocalStore::in_memory();
        store.write(|t| t.shows.upsert(details(1, "Show"))).await;
        let progress = ShowProgress::build(&details(1, "Show"), &[season(1, 1, 3)], &WatchedMarks::default(), &HashSet::new(), &HashSet::new());

        store
            .transaction(|t| progress.write(t, CollectionKind::History, membership(1)))
            .await
            .unwrap();

        let (seasons, episodes, shows) = store
            .read(|t| (t.seasons.len(), t.episodes.len(), t.my_shows.len()))
            .await;
        assert_eq!((seasons, episodes, shows), (1, 3, 1));
    }
}
