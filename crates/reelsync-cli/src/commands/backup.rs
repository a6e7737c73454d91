use super::sync_ui::SyncUi;
use super::{open_store, Session};
use crate::output::Output;
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::PathManager;
use media_sync_core::backup::{backup_file_name, export_backup, to_json};
use media_sync_core::{BackupImporter, ImportStatus, SyncError};
use serde_json::json;
use std::path::PathBuf;

pub async fn run_export(path: Option<PathBuf>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let store = open_store(&paths)?;

    let scheme = export_backup(&store)
        .await
        .map_err(|e| eyre!("Failed to export backup: {}", e))?;
    let json = to_json(&scheme).map_err(|e| eyre!("Failed to encode backup: {}", e))?;

    let file_name = backup_file_name(Utc::now());
    let target = match path {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => PathBuf::from(file_name),
    };
    tokio::fs::write(&target, json)
        .await
        .map_err(|e| eyre!("Failed to write backup to {}: {}", target.display(), e))?;

    tracing::info!(
        operation = "backup_export",
        path = %target.display(),
        shows = scheme.shows.collection_history.len(),
        movies = scheme.movies.collection_history.len(),
        lists = scheme.lists.lists.len(),
        "Backup exported"
    );
    output.success(format!("Backup written to {}", target.display()));
    Ok(())
}

pub async fn run_import(file: PathBuf, output: &Output) -> Result<()> {
    let json = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| eyre!("Failed to read backup {}: {}", file.display(), e))?;

    let session = Session::open(output).await?;
    let importer = BackupImporter::new(session.ctx().clone());
    let ui = SyncUi::new(output);
    let on_status = |status: ImportStatus| ui.import_status(status);

    let result = importer.import_json(&json, &on_status).await;
    ui.finish();

    let summary = match result {
        Ok(summary) => summary,
        Err(e @ SyncError::InvalidBackup(_)) => return Err(eyre!("{}", e)),
        Err(e) => {
            // Partial progress is still worth keeping
            session.persist().await?;
            return Err(eyre!("Backup import failed: {}", e));
        }
    };
    session.persist().await?;

    if output.is_human() {
        output.success(format!(
            "Imported {} show(s), {} episode(s), {} movie(s), {} rating(s), {} list(s) with {} item(s)",
            summary.shows, summary.episodes, summary.movies, summary.ratings, summary.lists, summary.list_items
        ));
        if summary.skipped > 0 {
            output.warn(format!("{} item(s) no longer exist on Trakt and were skipped", summary.skipped));
        }
    } else {
        output.json(&json!({
            "type": "backup_import",
            "shows": summary.shows,
            "episodes": summary.episodes,
            "movies": summary.movies,
            "ratings": summary.ratings,
            "lists": summary.lists,
            "list_items": summary.list_items,
            "skipped": summary.skipped,
        }));
    }
    Ok(())
}
