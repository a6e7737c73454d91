pub mod backup;
pub mod cancel;
pub mod context;
pub mod dates;
pub mod details;
pub mod error;
pub mod progress;
pub mod ratings;
pub mod retry;
pub mod runners;
pub mod scheduler;
pub mod show_progress;
pub mod sync;

#[cfg(test)]
mod testing;

pub use backup::{backup_file_name, export_backup, parse_backup, BackupImporter, ImportStatus, ImportSummary};
pub use context::SyncContext;
pub use error::SyncError;
pub use ratings::{RatedEntity, RatingsRepository};
pub use runners::SyncRunner;
pub use scheduler::SyncScheduler;
pub use sync::{
    Notification, NotificationAction, NoopListener, SyncEvent, SyncListener, SyncOrchestrator, SyncReport,
    SyncRequest,
};
