pub mod error;
pub mod traits;
pub mod trakt;
pub mod types;

pub use error::SourceError;
pub use traits::RemoteService;
pub use trakt::TraktClient;
pub use types::{
    RatingRequest, RatingRequestValue, RemoteCustomList, RemoteEpisode, RemoteListEntry,
    RemoteRating, RemoteSeason, RemoteWatched, RemoteWatchlistItem, RequestIds, SyncItem,
    SyncItemsRequest, WatchedEpisode,
};
