//! Full and quick sync runs, and the notifications they raise.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use media_sync_config::{CredentialStore, SnoozeTarget};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::runners::{self, SyncRunner};

pub const SYNC_PROGRESS_ID: u32 = 823;
pub const SYNC_SUCCESS_ID: u32 = 827;
pub const SYNC_ERROR_ID: u32 = 828;
pub const LISTS_LIMIT_ID: u32 = 832;
pub const WATCHLIST_LIMIT_ID: u32 = 833;
pub const QUICK_SYNC_PROGRESS_ID: u32 = 916;
pub const QUICK_SYNC_ERROR_ID: u32 = 917;

pub const AUTH_EXPIRED_TEXT: &str = "Your Trakt authorization has expired. Sign in again to keep syncing.";

pub const TRAKT_LISTS_INFO_URL: &str = "https://releasenotes.trakt.tv/release/Y2LCE-january-21-2025";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SyncStart,
    SyncProgress(String),
    SyncSuccess,
    SyncError,
    SyncAuthError,
    QuickSyncSuccess(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    MoreInfo(String),
    Snooze(SnoozeTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u32,
    pub title: String,
    pub text: String,
    pub actions: Vec<NotificationAction>,
    /// Progress notifications stay until dismissed.
    pub ongoing: bool,
}

impl Notification {
    fn new(id: u32, title: &str, text: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            text: text.to_string(),
            actions: Vec::new(),
            ongoing: false,
        }
    }

    fn progress(id: u32, text: &str) -> Self {
        Self {
            ongoing: true,
            ..Self::new(id, "Trakt sync", text)
        }
    }

    /// The sign-in prompt when `error` revoked the token, `text` otherwise.
    fn failure(id: u32, error: &SyncError, text: &str) -> Self {
        if error.is_unauthorized() {
            return Self::new(id, "Trakt sign-in required", AUTH_EXPIRED_TEXT);
        }
        Self::new(id, "Trakt sync failed", text)
    }

    fn account_limits(target: SnoozeTarget) -> Self {
        let (id, text) = match target {
            SnoozeTarget::Watchlist => (
                WATCHLIST_LIMIT_ID,
                "Your Trakt watchlist is full. Upgrade your account or remove items to keep syncing it.",
            ),
            SnoozeTarget::CustomLists => (
                LISTS_LIMIT_ID,
                "You have reached the Trakt limit for custom lists. Upgrade your account or remove lists to keep syncing them.",
            ),
        };
        Self {
            actions: vec![
                NotificationAction::MoreInfo(TRAKT_LISTS_INFO_URL.to_string()),
                NotificationAction::Snooze(target),
            ],
            ..Self::new(id, "Trakt account limits reached", text)
        }
    }
}

/// Receives sync events and notification requests. Passed into each run.
pub trait SyncListener: Send + Sync {
    fn on_event(&self, event: SyncEvent);

    fn show_notification(&self, notification: Notification);

    fn dismiss_notification(&self, id: u32);
}

/// Listener that ignores everything.
pub struct NoopListener;

impl SyncListener for NoopListener {
    fn on_event(&self, _: SyncEvent) {}

    fn show_notification(&self, _: Notification) {}

    fn dismiss_notification(&self, _: u32) {}
}

/// Dismisses a progress notification on every exit path, including drop on cancellation.
struct DismissOnDrop<'a> {
    listener: &'a dyn SyncListener,
    id: u32,
}

impl Drop for DismissOnDrop<'_> {
    fn drop(&mut self) {
        self.listener.dismiss_notification(self.id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub import: bool,
    pub export: bool,
    /// Skip success and failure notifications.
    pub silent: bool,
}

impl SyncRequest {
    pub fn manual() -> Self {
        Self {
            import: true,
            export: true,
            silent: false,
        }
    }

    /// What the periodic job runs.
    pub fn periodic() -> Self {
        Self {
            silent: true,
            ..Self::manual()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub imported: usize,
    pub exported: usize,
    /// Account limits hit during export. The run still succeeds.
    pub limits_reached: Vec<SnoozeTarget>,
    pub duration: Duration,
}

/// Account-limit errors from these runners are swallowed behind a snoozable notification.
fn limit_target(runner: SyncRunner) -> Option<SnoozeTarget> {
    match runner {
        SyncRunner::ExportWatchlist => Some(SnoozeTarget::Watchlist),
        SyncRunner::ExportLists | SyncRunner::ExportRatings => Some(SnoozeTarget::CustomLists),
        _ => None,
    }
}

/// Runs sync passes against one local store and remote account. Clones share
/// the credential store and the sync lock, so runs never overlap.
#[derive(Clone)]
pub struct SyncOrchestrator {
    ctx: SyncContext,
    credentials: Arc<Mutex<CredentialStore>>,
    lock: Arc<Mutex<()>>,
}

impl SyncOrchestrator {
    pub fn new(ctx: SyncContext, credentials: Arc<Mutex<CredentialStore>>) -> Self {
        Self {
            ctx,
            credentials,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Same orchestrator observing another cancellation token.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            ctx: self.ctx.clone().with_cancel(cancel),
            credentials: self.credentials.clone(),
            lock: self.lock.clone(),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.ctx.cancel
    }

    pub fn credentials(&self) -> &Arc<Mutex<CredentialStore>> {
        &self.credentials
    }

    /// True while another run holds the sync lock.
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Import then export, in runner order. Cancellation is returned as
    /// `SyncError::Cancelled` and never notifies.
    #[instrument(skip(self, listener))]
    pub async fn run(
        &self,
        request: SyncRequest,
        listener: &dyn SyncListener,
    ) -> Result<SyncReport, SyncError> {
        let _guard = self.lock.lock().await;
        let started = Instant::now();
        info!(operation = "sync_start", "Starting Trakt sync");

        listener.on_event(SyncEvent::SyncStart);
        listener.show_notification(Notification::progress(SYNC_PROGRESS_ID, "Starting sync..."));
        let _progress = DismissOnDrop {
            listener,
            id: SYNC_PROGRESS_ID,
        };

        let mut report = SyncReport::default();
        let result = self.run_steps(request, listener, &mut report).await;
        report.duration = started.elapsed();

        match result {
            Ok(()) => {
                self.record_last_sync().await;
                info!(
                    operation = "sync_complete",
                    imported = report.imported,
                    exported = report.exported,
                    duration_ms = report.duration.as_millis() as u64,
                    "Trakt sync finished"
                );
                listener.on_event(SyncEvent::SyncSuccess);
                if !request.silent {
                    listener.show_notification(Notification::new(
                        SYNC_SUCCESS_ID,
                        "Trakt sync",
                        "Sync completed successfully.",
                    ));
                }
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                info!(operation = "sync_cancelled", "Trakt sync cancelled");
                Err(SyncError::Cancelled)
            }
            Err(error) => {
                error!(operation = "sync_error", error = %error, "Trakt sync failed");
                if error.is_unauthorized() {
                    listener.on_event(SyncEvent::SyncAuthError);
                    self.revoke_token().await;
                } else {
                    listener.on_event(SyncEvent::SyncError);
                }
                if !request.silent {
                    listener.show_notification(Notification::failure(
                        SYNC_ERROR_ID,
                        &error,
                        "Something went wrong while syncing. Please try again later.",
                    ));
                }
                Err(error)
            }
        }
    }

    async fn run_steps(
        &self,
        request: SyncRequest,
        listener: &dyn SyncListener,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let on_item = |text: &str| listener.on_event(SyncEvent::SyncProgress(text.to_string()));

        let imports = SyncRunner::IMPORT.into_iter().filter(|_| request.import);
        let exports = SyncRunner::EXPORT.into_iter().filter(|_| request.export);
        for runner in imports.chain(exports) {
            cancel::check(&self.ctx.cancel)?;
            listener.on_event(SyncEvent::SyncProgress(runner.status().to_string()));
            listener.show_notification(Notification::progress(SYNC_PROGRESS_ID, runner.status()));

            match runner.run(&self.ctx, &on_item).await {
                Ok(count) if runner.is_import() => report.imported += count,
                Ok(count) => report.exported += count,
                Err(error) if error.is_account_limits() => {
                    let Some(target) = limit_target(runner) else {
                        return Err(error);
                    };
                    warn!(runner = runner.name(), error = %error, "Trakt account limits reached");
                    self.notify_account_limits(target, listener).await;
                    report.limits_reached.push(target);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Push pending history and list changes. Never fails: every outcome is
    /// turned into an event or a notification, and the exported count is returned.
    #[instrument(skip(self, listener))]
    pub async fn quick_sync(&self, listener: &dyn SyncListener) -> usize {
        let _guard = self.lock.lock().await;
        listener.show_notification(Notification::progress(QUICK_SYNC_PROGRESS_ID, "Exporting changes..."));
        let _progress = DismissOnDrop {
            listener,
            id: QUICK_SYNC_PROGRESS_ID,
        };

        let on_item = |text: &str| listener.on_event(SyncEvent::SyncProgress(text.to_string()));
        match runners::quick_sync(&self.ctx, &on_item).await {
            Ok(count) => {
                info!(operation = "quick_sync_complete", count, "Quick sync finished");
                if count > 0 {
                    listener.on_event(SyncEvent::QuickSyncSuccess(count));
                }
                count
            }
            Err(SyncError::Cancelled) => {
                debug!("Quick sync cancelled");
                0
            }
            Err(error) if error.is_account_limits() => {
                warn!(error = %error, "Trakt account limits reached during quick sync");
                self.notify_account_limits(SnoozeTarget::CustomLists, listener).await;
                0
            }
            Err(error) => {
                error!(operation = "quick_sync_error", error = %error, "Quick sync failed");
                if error.is_unauthorized() {
                    listener.on_event(SyncEvent::SyncAuthError);
                    self.revoke_token().await;
                }
                listener.show_notification(Notification::failure(
                    QUICK_SYNC_ERROR_ID,
                    &error,
                    "Recent changes could not be sent to Trakt.",
                ));
                0
            }
        }
    }

    /// Silence the account-limits notification for `target` and dismiss it.
    pub async fn snooze(
        &self,
        target: SnoozeTarget,
        listener: &dyn SyncListener,
    ) -> anyhow::Result<()> {
        {
            let mut credentials = self.credentials.lock().await;
            credentials.snooze(target, Utc::now());
            credentials.save()?;
        }
        info!(target = target.key(), "Account limits notification snoozed");
        listener.dismiss_notification(match target {
            SnoozeTarget::Watchlist => WATCHLIST_LIMIT_ID,
            SnoozeTarget::CustomLists => LISTS_LIMIT_ID,
        });
        Ok(())
    }

    async fn notify_account_limits(&self, target: SnoozeTarget, listener: &dyn SyncListener) {
        let snoozed = self.credentials.lock().await.is_snoozed(target, Utc::now());
        if snoozed {
            debug!(target = target.key(), "Account limits notification snoozed, skipping");
            return;
        }
        listener.show_notification(Notification::account_limits(target));
    }

    async fn record_last_sync(&self) {
        let mut credentials = self.credentials.lock().await;
        credentials.set_last_sync_timestamp(Utc::now());
        if let Err(e) = credentials.save() {
            warn!(error = %e, "Failed to persist last sync timestamp");
        }
    }

    async fn revoke_token(&self) {
        let mut credentials = self.credentials.lock().await;
        credentials.revoke_trakt_token();
        if let Err(e) = credentials.save() {
            warn!(error = %e, "Failed to persist revoked Trakt token");
        }
        warn!(operation = "token_revoked", "Trakt token revoked after an authorization failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::collection_record;
    use crate::testing::{context, details, FakeRemote, RecordingListener};
    use media_sync_models::{CollectionKind, MediaKind};
    use media_sync_sources::SourceError;
    use tempfile::TempDir;

    fn orchestrator(remote: Arc<FakeRemote>, dir: &TempDir) -> SyncOrchestrator {
        let mut credentials = CredentialStore::new(dir.path().join("credentials.toml"));
        credentials.set_trakt_access_token("token".to_string());
        SyncOrchestrator::new(context(remote), Arc::new(Mutex::new(credentials)))
    }

    async fn add_watchlist_show(orchestrator: &SyncOrchestrator) {
        orchestrator
            .context()
            .store
            .write(|t| {
                t.set_membership(
                    MediaKind::Show,
                    CollectionKind::Watchlist,
                    collection_record(&details(1, "Show"), Utc::now(), Utc::now()),
                )
            })
            .await;
    }

    #[tokio::test]
    async fn test_successful_sync() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(FakeRemote::default()), &dir);
        let listener = RecordingListener::default();

        orchestrator.run(SyncRequest::manual(), &listener).await.unwrap();

        let events = listener.events();
        assert_eq!(events.first(), Some(&SyncEvent::SyncStart));
        assert_eq!(events.last(), Some(&SyncEvent::SyncSuccess));
        assert!(listener.shown_ids().contains(&SYNC_SUCCESS_ID));
        assert_eq!(listener.dismissed(), vec![SYNC_PROGRESS_ID]);
        assert!(orchestrator.credentials().lock().await.get_last_sync_timestamp().is_some());
    }

    #[tokio::test]
    async fn test_silent_sync_shows_no_result() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(FakeRemote::default()), &dir);
        let listener = RecordingListener::default();

        orchestrator.run(SyncRequest::periodic(), &listener).await.unwrap();

        assert!(!listener.shown_ids().contains(&SYNC_SUCCESS_ID));
    }

    #[tokio::test]
    async fn test_unauthorized_revokes_token() {
        let remote = FakeRemote::default();
        remote.fail("fetch_watched", SourceError::Unauthorized("expired".to_string()));
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(remote), &dir);
        let listener = RecordingListener::default();

        let error = orchestrator.run(SyncRequest::manual(), &listener).await.unwrap_err();

        assert!(error.is_unauthorized());
        assert!(listener.events().contains(&SyncEvent::SyncAuthError));
        assert!(!listener.events().contains(&SyncEvent::SyncError));
        assert!(listener.shown_ids().contains(&SYNC_ERROR_ID));
        assert_eq!(listener.dismissed(), vec![SYNC_PROGRESS_ID]);
        assert!(!orchestrator.credentials().lock().await.is_trakt_authorized());
    }

    #[tokio::test]
    async fn test_unauthorized_asks_to_sign_in() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail("fetch_watched", SourceError::Unauthorized("expired".to_string()));
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(remote.clone(), &dir);
        let listener = RecordingListener::default();

        orchestrator.run(SyncRequest::manual(), &listener).await.unwrap_err();

        let shown = listener.shown.lock().unwrap().clone();
        let failure = shown.iter().find(|n| n.id == SYNC_ERROR_ID).unwrap();
        assert_eq!(failure.text, AUTH_EXPIRED_TEXT);

        remote.fail("fetch_watched", SourceError::Network("reset".to_string()));
        let listener = RecordingListener::default();
        orchestrator.run(SyncRequest::manual(), &listener).await.unwrap_err();

        let shown = listener.shown.lock().unwrap().clone();
        let failure = shown.iter().find(|n| n.id == SYNC_ERROR_ID).unwrap();
        assert_ne!(failure.text, AUTH_EXPIRED_TEXT);
    }

    #[tokio::test]
    async fn test_watchlist_limits_do_not_fail_sync() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail("post_watchlist", SourceError::AccountLimits("watchlist".to_string()));
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(remote.clone(), &dir);
        add_watchlist_show(&orchestrator).await;
        let listener = RecordingListener::default();

        let report = orchestrator.run(SyncRequest::manual(), &listener).await.unwrap();

        assert_eq!(report.limits_reached, vec![SnoozeTarget::Watchlist]);
        assert!(listener.shown_ids().contains(&WATCHLIST_LIMIT_ID));
        assert!(listener.events().contains(&SyncEvent::SyncSuccess));
        // Runners after the watchlist export still ran
        let ratings_status = SyncEvent::SyncProgress(SyncRunner::ExportRatings.status().to_string());
        assert!(listener.events().contains(&ratings_status));
        assert_eq!(remote.calls("post_watchlist"), 1);
    }

    #[tokio::test]
    async fn test_snoozed_limits_stay_quiet() {
        let remote = Arc::new(FakeRemote::default());
        remote.fail("post_watchlist", SourceError::AccountLimits("watchlist".to_string()));
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(remote, &dir);
        add_watchlist_show(&orchestrator).await;
        let listener = RecordingListener::default();

        orchestrator.snooze(SnoozeTarget::Watchlist, &listener).await.unwrap();
        assert_eq!(listener.dismissed(), vec![WATCHLIST_LIMIT_ID]);

        orchestrator.run(SyncRequest::manual(), &listener).await.unwrap();
        assert!(!listener.shown_ids().contains(&WATCHLIST_LIMIT_ID));

        // Snooze survives a reload of the credentials file
        let mut reloaded = CredentialStore::new(dir.path().join("credentials.toml"));
        reloaded.load().unwrap();
        assert!(reloaded.is_snoozed(SnoozeTarget::Watchlist, Utc::now()));
    }

    #[tokio::test]
    async fn test_cancelled_sync_never_notifies() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(FakeRemote::default()), &dir);
        orchestrator.cancel_token().cancel();
        let listener = RecordingListener::default();

        let error = orchestrator.run(SyncRequest::manual(), &listener).await.unwrap_err();

        assert!(error.is_cancelled());
        assert!(!listener.events().contains(&SyncEvent::SyncError));
        assert!(!listener.shown_ids().contains(&SYNC_ERROR_ID));
        assert_eq!(listener.dismissed(), vec![SYNC_PROGRESS_ID]);
        assert!(orchestrator.credentials().lock().await.get_last_sync_timestamp().is_none());
    }

    async fn add_watched_movie(orchestrator: &SyncOrchestrator) {
        orchestrator
            .context()
            .store
            .write(|t| {
                t.set_membership(
                    MediaKind::Movie,
                    CollectionKind::History,
                    collection_record(&details(7, "Movie"), Utc::now(), Utc::now()),
                )
            })
            .await;
    }

    #[tokio::test]
    async fn test_quick_sync_reports_count() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(FakeRemote::default()), &dir);
        add_watched_movie(&orchestrator).await;
        let listener = RecordingListener::default();

        assert_eq!(orchestrator.quick_sync(&listener).await, 1);
        assert!(listener.events().contains(&SyncEvent::QuickSyncSuccess(1)));
        assert_eq!(listener.dismissed(), vec![QUICK_SYNC_PROGRESS_ID]);

        // Nothing pending the second time, so no event
        assert_eq!(orchestrator.quick_sync(&listener).await, 0);
        assert_eq!(listener.events().iter().filter(|e| matches!(e, SyncEvent::QuickSyncSuccess(_))).count(), 1);
    }

    #[tokio::test]
    async fn test_quick_sync_failure_is_a_notification() {
        let remote = FakeRemote::default();
        remote.fail("post_history", SourceError::Network("reset".to_string()));
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(remote), &dir);
        add_watched_movie(&orchestrator).await;
        let listener = RecordingListener::default();

        assert_eq!(orchestrator.quick_sync(&listener).await, 0);
        assert!(listener.shown_ids().contains(&QUICK_SYNC_ERROR_ID));
        assert!(orchestrator.credentials().lock().await.is_trakt_authorized());
    }

    #[tokio::test]
    async fn test_quick_sync_cancelled_is_silent() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(Arc::new(FakeRemote::default()), &dir);
        orchestrator.cancel_token().cancel();
        let listener = RecordingListener::default();

        assert_eq!(orchestrator.quick_sync(&listener).await, 0);
        assert!(!listener.shown_ids().contains(&QUICK_SYNC_ERROR_ID));
        assert_eq!(listener.dismissed(), vec![QUICK_SYNC_PROGRESS_ID]);
    }
}
