use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default = "default_true")]
    pub movies_enabled: bool,
    /// Import shows and movies in parallel before lists.
    #[serde(default)]
    pub concurrent_import: bool,
    #[serde(default = "default_quick_sync_delay_secs")]
    pub quick_sync_delay_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry budget and rate-limit pacing for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_import_retries")]
    pub max_import_retries: u32,
    #[serde(default = "default_max_export_retries")]
    pub max_export_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64, // Pause between export chunks
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub schedule: SyncSchedule,
    #[serde(default)]
    pub run_on_startup: bool,
}

/// How often the periodic background sync runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncSchedule {
    #[default]
    Off,
    #[serde(rename = "every_3_hours")]
    Every3Hours,
    #[serde(rename = "every_6_hours")]
    Every6Hours,
    #[serde(rename = "every_12_hours")]
    Every12Hours,
    Daily,
}

impl SyncSchedule {
    pub const ALL: [SyncSchedule; 5] = [
        SyncSchedule::Off,
        SyncSchedule::Every3Hours,
        SyncSchedule::Every6Hours,
        SyncSchedule::Every12Hours,
        SyncSchedule::Daily,
    ];

    /// `None` when periodic sync is off.
    pub fn interval(&self) -> Option<Duration> {
        let hours = match self {
            SyncSchedule::Off => return None,
            SyncSchedule::Every3Hours => 3,
            SyncSchedule::Every6Hours => 6,
            SyncSchedule::Every12Hours => 12,
            SyncSchedule::Daily => 24,
        };
        Some(Duration::from_secs(hours * 60 * 60))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncSchedule::Off => "off",
            SyncSchedule::Every3Hours => "every_3_hours",
            SyncSchedule::Every6Hours => "every_6_hours",
            SyncSchedule::Every12Hours => "every_12_hours",
            SyncSchedule::Daily => "daily",
        }
    }
}

impl fmt::Display for SyncSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncSchedule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        SyncSchedule::ALL
            .into_iter()
            .find(|schedule| schedule.as_str() == normalized)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown schedule '{}'. Expected one of: off, every_3_hours, every_6_hours, every_12_hours, daily",
                    s
                )
            })
    }
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_TRAKT_API_URL.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_quick_sync_delay_secs() -> u64 {
    3
}

fn default_max_import_retries() -> u32 {
    3
}

fn default_max_export_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_rate_limit_delay_ms() -> u64 {
    1500
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            movies_enabled: default_true(),
            concurrent_import: false,
            quick_sync_delay_secs: default_quick_sync_delay_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_import_retries: default_max_import_retries(),
            max_export_retries: default_max_export_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// No waiting between attempts or chunks.
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            rate_limit_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

impl SyncOptions {
    pub fn quick_sync_delay(&self) -> Duration {
        Duration::from_secs(self.quick_sync_delay_secs)
    }
}

impl TraktConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            enabled: true,
            client_id,
            client_secret,
            api_url: default_api_url(),
            redirect_uri: default_redirect_uri(),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.is_empty()
            && self.client_id != "YOUR_CLIENT_ID"
            && !self.client_secret.is_empty()
            && self.client_secret != "YOUR_CLIENT_SECRET"
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(ref trakt) = self.trakt {
            if trakt.enabled {
                if trakt.client_id.is_empty() || trakt.client_id == "YOUR_CLIENT_ID" {
                    return Err(anyhow::anyhow!("Trakt is enabled but client_id is not configured"));
                }
                if trakt.client_secret.is_empty() || trakt.client_secret == "YOUR_CLIENT_SECRET" {
                    return Err(anyhow::anyhow!("Trakt is enabled but client_secret is not configured"));
                }
                if !trakt.api_url.starts_with("http://") && !trakt.api_url.starts_with("https://") {
                    return Err(anyhow::anyhow!("Invalid Trakt api_url: {}", trakt.api_url));
                }
            }
        }

        let retry = &self.sync.retry;
        if retry.max_import_retries == 0 {
            return Err(anyhow::anyhow!("sync.retry.max_import_retries must be at least 1"));
        }
        if retry.max_export_retries == 0 {
            return Err(anyhow::anyhow!("sync.retry.max_export_retries must be at least 1"));
        }

        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        self.trakt
            .as_ref()
            .map(|trakt| trakt.enabled && trakt.has_credentials())
            .unwrap_or(false)
    }
}
