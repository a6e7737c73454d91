pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, RetryConfig, SchedulerConfig, SyncOptions, SyncSchedule, TraktConfig};
pub use credentials::{CredentialStore, SnoozeTarget, SNOOZE_DAYS};
pub use paths::{container_base_path, PathManager};
