use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use media_sync_config::{RetryConfig, SyncOptions};
use media_sync_models::TraktId;
use media_sync_sources::RemoteService;
use media_sync_store::LocalStore;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ratings::RatingsRepository;

/// Everything a runner needs: the local store, the remote service, sync
/// options and the cancellation token of the current run.
#[derive(Clone)]
pub struct SyncContext {
    pub store: LocalStore,
    pub remote: Arc<dyn RemoteService>,
    pub options: SyncOptions,
    pub cancel: CancellationToken,
    /// Per show, watched (season, episode) pairs its remote season list lacked
    /// on the last fetch. Shared by every clone.
    pub(crate) unresolved_episodes: Arc<Mutex<HashMap<TraktId, HashSet<(u32, u32)>>>>,
}

impl SyncContext {
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteService>, options: SyncOptions) -> Self {
        Self {
            store,
            remote,
            options,
            cancel: CancellationToken::new(),
            unresolved_episodes: Arc::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn movies_enabled(&self) -> bool {
        self.options.movies_enabled
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.options.retry
    }

    pub fn ratings(&self) -> RatingsRepository {
        RatingsRepository::new(self.store.clone(), self.remote.clone(), self.movies_enabled())
    }
}
