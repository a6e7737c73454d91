pub mod backup;
pub mod backup_v1;
pub mod collection;
pub mod custom_list;
pub mod ids;
pub mod media;
pub mod progress;
pub mod rating;

pub use backup::{
    BackupEpisode, BackupEpisodeRating, BackupList, BackupListItem, BackupLists, BackupMovie,
    BackupMovieRating, BackupMovies, BackupScheme, BackupSeason, BackupSeasonRating, BackupShow,
    BackupShowRating, BackupShows, SCHEME_PLATFORM, SCHEME_VERSION,
};
pub use backup_v1::BackupScheme1;
pub use collection::{CollectionKind, CollectionRecord};
pub use custom_list::{CustomList, CustomListItem};
pub use ids::{TmdbId, TraktId, UNKNOWN_ID};
pub use media::{MediaDetails, MediaKind};
pub use progress::{EpisodeRecord, SeasonRecord};
pub use rating::{RatingKind, RatingRecord};
