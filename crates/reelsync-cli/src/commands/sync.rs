use super::sync_ui::SyncUi;
use super::Session;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::SnoozeTarget;
use media_sync_core::{SyncError, SyncRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(operation = "interrupted", "Ctrl-C received, cancelling");
            token.cancel();
        }
    });
}

pub async fn run_sync(import: bool, export: bool, silent: bool, output: &Output) -> Result<()> {
    tracing::debug!(import, export, silent, "Sync command started");
    let session = Session::open(output).await?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let orchestrator = session.orchestrator.with_cancel(cancel);

    let ui = SyncUi::new(output);
    let request = SyncRequest { import, export, silent };
    let result = orchestrator.run(request, &ui).await;
    ui.finish();

    // Whatever was imported before a failure is kept
    session.persist().await?;

    match result {
        Ok(report) => {
            if output.is_human() {
                output.info(format!(
                    "Imported {} and exported {} item(s) in {:.1}s",
                    report.imported,
                    report.exported,
                    report.duration.as_secs_f64()
                ));
            } else {
                output.json(&json!({
                    "type": "sync_result",
                    "imported": report.imported,
                    "exported": report.exported,
                    "duration_ms": report.duration.as_millis() as u64,
                    "limits_reached": report.limits_reached.iter().map(|t| t.key()).collect::<Vec<_>>(),
                }));
            }
            Ok(())
        }
        Err(SyncError::Cancelled) => {
            output.warn("Sync cancelled");
            Ok(())
        }
        Err(e) => Err(eyre!("Sync failed: {}", e)),
    }
}

pub async fn run_quick_sync(output: &Output) -> Result<()> {
    let session = Session::open(output).await?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let orchestrator = session.orchestrator.with_cancel(cancel);

    let ui = SyncUi::new(output);
    let count = orchestrator.quick_sync(&ui).await;
    ui.finish();
    session.persist().await?;

    if count == 0 {
        output.info("Nothing to export");
    }
    Ok(())
}

pub async fn run_snooze(target: SnoozeTarget, output: &Output) -> Result<()> {
    let session = Session::open(output).await?;
    let ui = SyncUi::new(output);
    session
        .orchestrator
        .snooze(target, &ui)
        .await
        .map_err(|e| eyre!("Failed to save snooze: {}", e))?;
    output.success("Notification snoozed for 30 days");
    Ok(())
}
