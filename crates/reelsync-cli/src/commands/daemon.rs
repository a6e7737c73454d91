use super::Session;
use crate::logging;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{PathManager, SyncSchedule};
use media_sync_core::{Notification, SyncEvent, SyncListener, SyncRequest, SyncScheduler};
use media_sync_store::LocalStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Saves the store after every successful run and prints result notifications.
struct DaemonListener {
    store: LocalStore,
    output: Output,
}

impl DaemonListener {
    fn persist_in_background(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.persist().await {
                error!(operation = "store_persist", error = %e, "Failed to save the local store");
            }
        });
    }
}

impl SyncListener for DaemonListener {
    fn on_event(&self, event: SyncEvent) {
        match event {
            SyncEvent::SyncSuccess | SyncEvent::QuickSyncSuccess(_) => self.persist_in_background(),
            SyncEvent::SyncAuthError => {
                error!(operation = "sync_auth_error", "Trakt authorization expired. Run 'reelsync auth' to sign in again.")
            }
            SyncEvent::SyncProgress(text) => tracing::debug!(operation = "progress", message = %text),
            SyncEvent::SyncStart | SyncEvent::SyncError => {}
        }
    }

    fn show_notification(&self, notification: Notification) {
        if notification.ongoing {
            return;
        }
        info!(
            operation = "notification",
            id = notification.id,
            title = %notification.title,
            "{}",
            notification.text
        );
        self.output.notification(&notification);
    }

    fn dismiss_notification(&self, _id: u32) {}
}

pub async fn run_daemon(
    schedule_override: Option<SyncSchedule>,
    no_startup_sync: bool,
    verbose: u8,
    quiet: bool,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();
    let log_file = paths.daemon_log_file();
    logging::init_file_logging(verbose, quiet, &log_file)
        .map_err(|e| eyre!("Failed to set up logging at {}: {}", log_file.display(), e))?;
    output.info(format!("Logs are being written to: {}", log_file.display()));

    let session = Session::open(output).await?;
    let schedule = schedule_override.unwrap_or(session.config.scheduler.schedule);
    let run_on_startup = !no_startup_sync && session.config.scheduler.run_on_startup;

    let listener = Arc::new(DaemonListener {
        store: session.store.clone(),
        output: output.clone(),
    });
    let scheduler = SyncScheduler::new(session.orchestrator.clone(), listener).await?;
    scheduler.start().await?;
    scheduler.set_schedule(schedule).await?;

    info!(
        operation = "daemon_started",
        schedule = %schedule,
        run_on_startup,
        "Daemon started"
    );
    if schedule == SyncSchedule::Off {
        output.warn("Periodic sync is off. Set [scheduler] schedule in config.toml or pass --schedule.");
    } else {
        output.success(format!("Syncing with Trakt on schedule '{}'. Press Ctrl-C to stop.", schedule));
    }

    if run_on_startup {
        scheduler.request_sync(SyncRequest::periodic()).await;
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;
    warn!(operation = "daemon_stopping", "Shutting down, cancelling running syncs");

    scheduler.shutdown().await?;
    session.persist().await?;
    output.success("Daemon stopped");
    Ok(())
}
