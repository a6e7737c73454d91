use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How long an account-limits notification stays quiet after a snooze.
pub const SNOOZE_DAYS: i64 = 30;

const TRAKT_ACCESS_TOKEN: &str = "trakt_access_token";
const TRAKT_REFRESH_TOKEN: &str = "trakt_refresh_token";
const TRAKT_TOKEN_EXPIRES: &str = "trakt_token_expires";
const LAST_SYNC: &str = "trakt_last_sync";

/// The account-limits notifications a user can snooze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnoozeTarget {
    CustomLists,
    Watchlist,
}

impl SnoozeTarget {
    pub fn key(&self) -> &'static str {
        match self {
            SnoozeTarget::CustomLists => "custom_list_notification_snoozed_at",
            SnoozeTarget::Watchlist => "watchlist_notification_snoozed_at",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value store for tokens and small persisted preferences.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    // Trakt tokens
    pub fn get_trakt_access_token(&self) -> Option<&String> {
        self.get(TRAKT_ACCESS_TOKEN)
    }

    pub fn set_trakt_access_token(&mut self, token: String) {
        self.set(TRAKT_ACCESS_TOKEN.to_string(), token);
    }

    pub fn get_trakt_refresh_token(&self) -> Option<&String> {
        self.get(TRAKT_REFRESH_TOKEN)
    }

    pub fn set_trakt_refresh_token(&mut self, token: String) {
        self.set(TRAKT_REFRESH_TOKEN.to_string(), token);
    }

    pub fn get_trakt_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp(TRAKT_TOKEN_EXPIRES)
    }

    pub fn set_trakt_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set(TRAKT_TOKEN_EXPIRES.to_string(), expires.to_rfc3339());
    }

    /// Drop every stored Trakt token.
    pub fn revoke_trakt_token(&mut self) {
        self.remove(TRAKT_ACCESS_TOKEN);
        self.remove(TRAKT_REFRESH_TOKEN);
        self.remove(TRAKT_TOKEN_EXPIRES);
    }

    pub fn is_trakt_authorized(&self) -> bool {
        self.get_trakt_access_token().map(|t| !t.is_empty()).unwrap_or(false)
    }

    // Snooze
    pub fn get_snoozed_at(&self, target: SnoozeTarget) -> Option<DateTime<Utc>> {
        self.get_timestamp(target.key())
    }

    pub fn snooze(&mut self, target: SnoozeTarget, at: DateTime<Utc>) {
        self.set(target.key().to_string(), at.to_rfc3339());
    }

    /// True while a snooze recorded less than `SNOOZE_DAYS` ago is active.
    pub fn is_snoozed(&self, target: SnoozeTarget, now: DateTime<Utc>) -> bool {
        self.get_snoozed_at(target)
            .map(|at| now < at + Duration::days(SNOOZE_DAYS))
            .unwrap_or(false)
    }

    // Sync bookkeeping
    pub fn get_last_sync_timestamp(&self) -> Option<DateTime<Utc>> {
        self.get_timestamp(LAST_SYNC)
    }

    pub fn set_last_sync_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.set(LAST_SYNC.to_string(), timestamp.to_rfc3339());
    }

    /// Forget the last sync time and every snooze, keeping tokens.
    pub fn clear_sync_state(&mut self) {
        self.remove(LAST_SYNC);
        for target in [SnoozeTarget::CustomLists, SnoozeTarget::Watchlist] {
            self.remove(target.key());
        }
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_access_token("test_token".to_string());
        store.set_trakt_refresh_token("refresh".to_string());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get_trakt_access_token(), Some(&"test_token".to_string()));
        assert!(loaded_store.is_trakt_authorized());
    }

    #[test]
    fn test_credential_store_trakt_token_expires() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        let expires = Utc::now() + Duration::hours(1);
        store.set_trakt_token_expires(expires);
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        let loaded_expires = loaded_store.get_trakt_token_expires().unwrap();
        assert!((loaded_expires - expires).num_seconds().abs() < 2);
    }

    #[test]
    fn test_revoke_trakt_token() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set_trakt_access_token("a".to_string());
        store.set_trakt_refresh_token("r".to_string());
        store.set_trakt_token_expires(Utc::now());
        store.set_last_sync_timestamp(Utc::now());

        store.revoke_trakt_token();

        assert!(!store.is_trakt_authorized());
        assert_eq!(store.get_trakt_refresh_token(), None);
        assert_eq!(store.get_trakt_token_expires(), None);
        assert!(store.get_last_sync_timestamp().is_some());
    }

    #[test]
    fn test_snooze_window() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        let now = Utc::now();
        assert!(!store.is_snoozed(SnoozeTarget::Watchlist, now));

        store.snooze(SnoozeTarget::Watchlist, now);
        assert!(store.is_snoozed(SnoozeTarget::Watchlist, now + Duration::days(29)));
        assert!(!store.is_snoozed(SnoozeTarget::Watchlist, now + Duration::days(30)));
        assert!(!store.is_snoozed(SnoozeTarget::CustomLists, now));
    }

    #[test]
    fn test_clear_sync_state_keeps_tokens() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        let now = Utc::now();
        store.set_trakt_access_token("a".to_string());
        store.set_last_sync_timestamp(now);
        store.snooze(SnoozeTarget::CustomLists, now);

        store.clear_sync_state();

        assert!(store.is_trakt_authorized());
        assert_eq!(store.get_last_sync_timestamp(), None);
        assert!(!store.is_snoozed(SnoozeTarget::CustomLists, now));
    }

    #[test]
    fn test_credential_store_remove() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set("key1".to_string(), "value1".to_string());
        store.set("key2".to_string(), "value2".to_string());

        store.remove("key1");
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key2"), Some(&"value2".to_string()));
    }
}
