use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use media_sync_config::{CredentialStore, TraktConfig};
use media_sync_models::{MediaDetails, MediaKind, RatingKind, TraktId};
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::error::SourceError;
use crate::traits::RemoteService;
use crate::trakt::api::{self, Endpoint};
use crate::trakt::auth;
use crate::types::{
    RatingRequest, RatingRequestValue, RemoteCustomList, RemoteListEntry, RemoteRating,
    RemoteSeason, RemoteWatched, RemoteWatchlistItem, RequestIds, SyncItemsRequest,
};

#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    api_url: String,
    client_id: String,
    access_token: Option<String>,
}

impl TraktClient {
    pub fn new(config: &TraktConfig) -> Self {
        Self {
            client: Arc::new(auth::create_trakt_client()),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build a client from stored tokens, refreshing them first when they are
    /// about to expire. Without a stored token every call fails with
    /// `SourceError::NotAuthenticated`.
    pub async fn from_credentials(
        config: &TraktConfig,
        cred_store: &mut CredentialStore,
    ) -> Result<Self> {
        let mut client = Self::new(config);

        let Some(saved_token) = cred_store.get_trakt_access_token().cloned() else {
            return Ok(client);
        };

        let expiring = cred_store
            .get_trakt_token_expires()
            .map(|expires_at| expires_at <= Utc::now() + Duration::minutes(5))
            .unwrap_or(false);

        if expiring {
            if let Some(refresh_token) = cred_store.get_trakt_refresh_token().cloned() {
                info!("Trakt access token expired or expiring soon, refreshing");
                let token_info = auth::refresh_access_token(
                    &client.client,
                    &client.api_url,
                    &config.client_id,
                    &config.client_secret,
                    &config.redirect_uri,
                    &refresh_token,
                )
                .await?;

                cred_store.set_trakt_access_token(token_info.access_token.clone());
                cred_store.set_trakt_refresh_token(token_info.refresh_token);
                cred_store.set_trakt_token_expires(token_info.expires_at);
                cred_store.save()?;

                client.access_token = Some(token_info.access_token);
                return Ok(client);
            }
        }

        client.access_token = Some(saved_token);
        Ok(client)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn endpoint(&self) -> Result<Endpoint<'_>, SourceError> {
        let access_token = self.access_token.as_deref().ok_or(SourceError::NotAuthenticated)?;
        Ok(Endpoint {
            base_url: &self.api_url,
            access_token,
            client_id: &self.client_id,
        })
    }
}

#[async_trait]
impl RemoteService for TraktClient {
    fn service_name(&self) -> &str {
        "trakt"
    }

    async fn fetch_ratings(&self, kind: RatingKind) -> Result<Vec<RemoteRating>, SourceError> {
        api::get_ratings(&self.client, self.endpoint()?, kind).await
    }

    async fn post_ratings(&self, request: &RatingRequest) -> Result<(), SourceError> {
        if request.is_empty() {
            return Ok(());
        }
        api::set_ratings(&self.client, self.endpoint()?, request).await
    }

    async fn post_rating(
        &self,
        kind: RatingKind,
        trakt_id: TraktId,
        rating: u8,
        rated_at: &str,
    ) -> Result<(), SourceError> {
        let request = RatingRequest::single(
            kind,
            RatingRequestValue {
                rating,
                rated_at: rated_at.to_string(),
                ids: RequestIds { trakt: trakt_id },
            },
        );
        api::set_ratings(&self.client, self.endpoint()?, &request).await
    }

    async fn delete_rating(&self, kind: RatingKind, trakt_id: TraktId) -> Result<(), SourceError> {
        api::remove_rating(&self.client, self.endpoint()?, kind, trakt_id).await
    }

    async fn fetch_seasons(&self, show_id: TraktId) -> Result<Vec<RemoteSeason>, SourceError> {
        api::get_seasons(&self.client, self.endpoint()?, show_id).await
    }

    async fn fetch_details(
        &self,
        media: MediaKind,
        trakt_id: TraktId,
    ) -> Result<MediaDetails, SourceError> {
        api::get_details(&self.client, self.endpoint()?, media, trakt_id).await
    }

    async fn fetch_watched(&self, media: MediaKind) -> Result<Vec<RemoteWatched>, SourceError> {
        api::get_watched(&self.client, self.endpoint()?, media).await
    }

    async fn fetch_watchlist(
        &self,
        media: MediaKind,
    ) -> Result<Vec<RemoteWatchlistItem>, SourceError> {
        api::get_watchlist(&self.client, self.endpoint()?, media).await
    }

    async fn post_history(&self, request: &SyncItemsRequest) -> Result<(), SourceError> {
        if request.is_empty() {
            return Ok(());
        }
        api::add_to_history(&self.client, self.endpoint()?, request).await
    }

    async fn post_watchlist(&self, request: &SyncItemsRequest) -> Result<(), SourceError> {
        if request.is_empty() {
            return Ok(());
        }
        api::add_to_watchlist(&self.client, self.endpoint()?, request).await
    }

    async fn fetch_lists(&self) -> Result<Vec<RemoteCustomList>, SourceError> {
        api::get_lists(&self.client, self.endpoint()?).await
    }

    async fn fetch_list_items(
        &self,
        list_id: TraktId,
    ) -> Result<Vec<RemoteListEntry>, SourceError> {
        api::get_list_items(&self.client, self.endpoint()?, list_id).await
    }

    async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
        privacy: &str,
    ) -> Result<RemoteCustomList, SourceError> {
        api::create_list(&self.client, self.endpoint()?, name, description, privacy).await
    }

    async fn post_list_items(
        &self,
        list_id: TraktId,
        request: &SyncItemsRequest,
    ) -> Result<(), SourceError> {
        if request.is_empty() {
            return Ok(());
        }
        api::add_list_items(&self.client, self.endpoint()?, list_id, request).await
    }
}
