//! Versioned JSON backup of the local store.

mod export;
mod import;
mod migration;
mod parse;

use chrono::{DateTime, Utc};

pub use export::{export_backup, to_json};
pub use import::{BackupImporter, ImportStatus, ImportSummary, StatusListener};
pub use migration::migrate_v1;
pub use parse::parse_backup;

/// Suggested file name for a backup taken at `at`.
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("reelsync_export_{}.json", at.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;

    #[test]
    fn test_backup_file_name() {
        let at = parse_date("2024-03-05T07:08:09Z").unwrap();
        assert_eq!(backup_file_name(at), "reelsync_export_20240305070809.json");
    }
}
