use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const AUTHORIZE_URL: &str = "https://trakt.tv/oauth/authorize";

pub fn create_trakt_client() -> Client {
    Client::builder()
        .user_agent(concat!("reelsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TokenResponse> for TokenInfo {
    fn from(token: TokenResponse) -> Self {
        // Refresh two minutes early
        let expires_at = Utc::now() + Duration::seconds(token.expires_in as i64 - 120);
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        }
    }
}

/// Where the user grants access and copies the authorization code from.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL, client_id, redirect_uri
    )
}

async fn request_token(
    client: &Client,
    api_url: &str,
    payload: serde_json::Value,
    what: &str,
) -> Result<TokenInfo> {
    let response = client
        .post(format!("{}/oauth/token", api_url))
        .json(&payload)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} failed: {} - {}", what, status, error_text));
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(token_response.into())
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenInfo> {
    let code = code.trim();
    if code.is_empty() {
        return Err(anyhow!("Authorization code cannot be empty"));
    }
    let payload = serde_json::json!({
        "code": code,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": redirect_uri,
        "grant_type": "authorization_code"
    });
    request_token(client, api_url, payload, "Authorization code exchange").await
}

pub async fn refresh_access_token(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
    refresh_token: &str,
) -> Result<TokenInfo> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": client_id,
        "client_secret": client_secret,
        "redirect_uri": redirect_uri,
        "grant_type": "refresh_token"
    });
    request_token(client, api_url, payload, "Token refresh").await
}

/// Invalidate a token on the remote side.
pub async fn revoke_token(
    client: &Client,
    api_url: &str,
    client_id: &str,
    client_secret: &str,
    access_token: &str,
) -> Result<()> {
    let payload = serde_json::json!({
        "token": access_token,
        "client_id": client_id,
        "client_secret": client_secret,
    });
    let response = client
        .post(format!("{}/oauth/revoke", api_url))
        .json(&payload)
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("Token revoke failed: {}", response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let url = authorize_url("abc", "urn:ietf:wg:oauth:2.0:oob");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=abc"));
    }

    #[test]
    fn test_token_expiry_margin() {
        let info: TokenInfo = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 7200,
        }
        .into();
        let remaining = info.expires_at - Utc::now();
        assert!(remaining <= Duration::seconds(7080));
        assert!(remaining > Duration::seconds(7000));
    }
}
