use media_sync_models::{BackupScheme, BackupScheme1, SCHEME_VERSION};
use serde::Deserialize;
use tracing::info;

use super::migration::migrate_v1;
use crate::error::SyncError;

#[derive(Deserialize)]
struct Envelope {
    version: u32,
}

fn invalid(e: serde_json::Error) -> SyncError {
    SyncError::InvalidBackup(e.to_string())
}

/// Decode a backup file. The version is read on its own first; older
/// versions are decoded with their own scheme and migrated.
pub fn parse_backup(json: &str) -> Result<BackupScheme, SyncError> {
    let envelope: Envelope = serde_json::from_str(json).map_err(invalid)?;

    match envelope.version {
        v if v < SCHEME_VERSION => {
            info!(version = v, "Migrating backup to version {}", SCHEME_VERSION);
            let old: BackupScheme1 = serde_json::from_str(json).map_err(invalid)?;
            Ok(migrate_v1(old))
        }
        SCHEME_VERSION => serde_json::from_str(json).map_err(invalid),
        v => Err(SyncError::InvalidBackup(format!(
            "Backup version {} is newer than the supported version {}",
            v, SCHEME_VERSION
        ))),
    }
}
