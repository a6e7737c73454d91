use crate::output::Output;
use indicatif::{ProgressBar, ProgressStyle};
use media_sync_core::sync::{QUICK_SYNC_PROGRESS_ID, SYNC_PROGRESS_ID};
use media_sync_core::{ImportStatus, Notification, SyncEvent, SyncListener};
use std::io::IsTerminal;
use std::time::Duration;

/// Terminal front end for sync runs: a spinner for progress, printed
/// notifications for results.
pub struct SyncUi {
    spinner: ProgressBar,
    interactive: bool,
    output: Output,
}

impl SyncUi {
    pub fn new(output: &Output) -> Self {
        let interactive = is_interactive() && output.is_human() && !output.is_quiet();
        let spinner = if interactive {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        } else {
            tracing::info!(
                operation = "ui_init",
                mode = "non_interactive",
                "Running in non-interactive mode - progress bars disabled, using structured logging"
            );
            ProgressBar::hidden()
        };

        Self {
            spinner,
            interactive,
            output: output.clone(),
        }
    }

    fn set_message(&self, text: &str) {
        // Item lines span several lines, the spinner takes one
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.interactive {
            self.spinner.set_message(line);
        } else {
            tracing::info!(operation = "progress", message = %line, "Progress update");
        }
    }

    /// Status updates from a backup import.
    pub fn import_status(&self, status: ImportStatus) {
        match status {
            ImportStatus::Initializing => self.set_message("Reading backup..."),
            ImportStatus::Importing(text) => self.set_message(&text),
            ImportStatus::Idle => self.spinner.finish_and_clear(),
        }
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl SyncListener for SyncUi {
    fn on_event(&self, event: SyncEvent) {
        match event {
            SyncEvent::SyncProgress(text) => self.set_message(&text),
            SyncEvent::QuickSyncSuccess(count) => self
                .spinner
                .suspend(|| self.output.success(format!("Exported {} item(s) to Trakt", count))),
            SyncEvent::SyncAuthError => self.spinner.suspend(|| {
                self.output
                    .warn("Trakt authorization expired and was removed. Run 'reelsync auth' to sign in again.")
            }),
            SyncEvent::SyncStart | SyncEvent::SyncSuccess | SyncEvent::SyncError => {
                tracing::debug!(event = ?event, "Sync event");
            }
        }
    }

    fn show_notification(&self, notification: Notification) {
        if notification.ongoing {
            self.set_message(&notification.text);
        } else {
            self.spinner.suspend(|| self.output.notification(&notification));
        }
    }

    fn dismiss_notification(&self, id: u32) {
        if id == SYNC_PROGRESS_ID || id == QUICK_SYNC_PROGRESS_ID {
            self.spinner.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}
