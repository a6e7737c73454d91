pub mod auth;
pub mod backup;
pub mod clear;
pub mod config;
pub mod daemon;
pub mod prompts;
pub mod rate;
pub mod status;
pub mod sync;
pub mod sync_ui;

use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{Config, CredentialStore, PathManager};
use media_sync_core::{SyncContext, SyncOrchestrator};
use media_sync_sources::TraktClient;
use media_sync_store::LocalStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a command needs to talk to Trakt and the local store.
pub struct Session {
    pub paths: PathManager,
    pub config: Config,
    pub store: LocalStore,
    pub orchestrator: SyncOrchestrator,
}

impl Session {
    pub async fn open(output: &Output) -> Result<Self> {
        let paths = PathManager::default();
        let config = load_config(&paths)?;
        let trakt = config
            .trakt
            .as_ref()
            .filter(|_| config.is_trakt_configured())
            .ok_or_else(|| eyre!("Trakt is not configured. Run 'reelsync config trakt' first."))?;

        let credentials_file = paths.credentials_file();
        let mut cred_store = CredentialStore::new(credentials_file.clone());
        cred_store
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

        let client = TraktClient::from_credentials(trakt, &mut cred_store)
            .await
            .map_err(|e| eyre!("Failed to restore the Trakt session: {}", e))?;
        if !client.is_authenticated() {
            output.warn("Not authorized with Trakt. Run 'reelsync auth' to sign in.");
        }

        let store = open_store(&paths)?;
        let ctx = SyncContext::new(store.clone(), Arc::new(client), config.sync.clone());
        let orchestrator = SyncOrchestrator::new(ctx, Arc::new(Mutex::new(cred_store)));

        Ok(Self {
            paths,
            config,
            store,
            orchestrator,
        })
    }

    pub fn ctx(&self) -> &SyncContext {
        self.orchestrator.context()
    }

    pub async fn persist(&self) -> Result<()> {
        self.store
            .persist()
            .await
            .map_err(|e| eyre!("Failed to save the local store to {}: {}", self.paths.store_file().display(), e))
    }
}

pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(eyre!(
            "Configuration file not found at {}. Run 'reelsync config trakt' first.",
            config_file.display()
        ));
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| eyre!("Configuration validation failed: {}", e))?;
    Ok(config)
}

pub fn open_store(paths: &PathManager) -> Result<LocalStore> {
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;
    let store_file = paths.store_file();
    LocalStore::open(&store_file).map_err(|e| eyre!("Failed to open local store at {}: {}", store_file.display(), e))
}
