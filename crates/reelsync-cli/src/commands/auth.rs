use super::{load_config, prompts};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{CredentialStore, PathManager};
use media_sync_sources::trakt::auth;
use tracing::{info, warn};

pub async fn run_auth(revoke: bool, output: &Output) -> Result<()> {
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

    let client = auth::create_trakt_client();

    if revoke {
        if let Some(token) = cred_store.get_trakt_access_token().cloned() {
            // The local token is dropped even if Trakt refuses the revoke
            if let Err(e) = auth::revoke_token(&client, &trakt.api_url, &trakt.client_id, &trakt.client_secret, &token).await {
                warn!(error = %e, "Failed to revoke the token on Trakt");
            }
        }
        cred_store.revoke_trakt_token();
        cred_store
            .save()
            .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
        output.success("Signed out of Trakt");
        return Ok(());
    }

    output.info("Open this URL in your browser and authorize ReelSync:");
    output.info(auth::authorize_url(&trakt.client_id, &trakt.redirect_uri));
    output.info("");
    let code = prompts::prompt_string("Authorization code", None)?;

    let token_info = auth::exchange_code(
        &client,
        &trakt.api_url,
        &trakt.client_id,
        &trakt.client_secret,
        &trakt.redirect_uri,
        &code,
    )
    .await
    .map_err(|e| eyre!("Trakt authorization failed: {}", e))?;

    cred_store.set_trakt_access_token(token_info.access_token);
    cred_store.set_trakt_refresh_token(token_info.refresh_token);
    cred_store.set_trakt_token_expires(token_info.expires_at);
    cred_store
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    info!(operation = "trakt_authorized", expires_at = %token_info.expires_at, "Trakt authorization stored");
    output.success("Authorized with Trakt");
    Ok(())
}
