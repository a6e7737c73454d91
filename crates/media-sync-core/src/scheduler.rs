//! Background sync jobs: one-off, periodic and quick sync.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use media_sync_config::SyncSchedule;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel;
use crate::error::SyncError;
use crate::sync::{SyncListener, SyncOrchestrator, SyncRequest};

struct PeriodicJob {
    schedule: SyncSchedule,
    id: Uuid,
}

/// Owns the background sync jobs of one orchestrator. Runs share the
/// orchestrator's sync lock, so a one-off, a periodic and a quick sync never
/// overlap.
pub struct SyncScheduler {
    orchestrator: SyncOrchestrator,
    listener: Arc<dyn SyncListener>,
    cron: JobScheduler,
    periodic: Mutex<Option<PeriodicJob>>,
    one_off: Mutex<Option<JoinHandle<()>>>,
    quick: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl SyncScheduler {
    pub async fn new(
        orchestrator: SyncOrchestrator,
        listener: Arc<dyn SyncListener>,
    ) -> Result<Self, SyncError> {
        let cron = JobScheduler::new()
            .await
            .map_err(|e| SyncError::Scheduler(e.to_string()))?;

        Ok(Self {
            orchestrator,
            listener,
            cron,
            periodic: Mutex::new(None),
            one_off: Mutex::new(None),
            quick: Mutex::new(None),
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }

    pub async fn start(&self) -> Result<(), SyncError> {
        self.cron
            .start()
            .await
            .map_err(|e| SyncError::Scheduler(e.to_string()))?;
        self.started.store(true, Ordering::SeqCst);
        info!(operation = "scheduler_started", "Sync scheduler started");
        Ok(())
    }

    /// Queue a one-off sync. Dropped when another one-off sync is still
    /// running; returns whether the request was accepted.
    pub async fn request_sync(&self, request: SyncRequest) -> bool {
        let mut slot = self.one_off.lock().await;
        if slot.as_ref().map(|handle| !handle.is_finished()).unwrap_or(false) {
            debug!("One-off sync already running, request dropped");
            return false;
        }

        let orchestrator = self.orchestrator.with_cancel(self.shutdown.child_token());
        let listener = self.listener.clone();
        *slot = Some(tokio::spawn(async move {
            run_logged(&orchestrator, request, listener.as_ref()).await;
        }));
        true
    }

    /// Queue a quick sync after the configured delay. A request arriving
    /// while another is pending runs after it.
    pub async fn request_quick_sync(&self) {
        let mut slot = self.quick.lock().await;
        let previous = slot.take();

        let orchestrator = self.orchestrator.with_cancel(self.shutdown.child_token());
        let listener = self.listener.clone();
        let delay = orchestrator.context().options.quick_sync_delay();
        *slot = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                // A failed or aborted predecessor does not block this run
                let _ = previous.await;
            }
            if cancel::sleep(orchestrator.cancel_token(), delay).await.is_err() {
                return;
            }
            orchestrator.quick_sync(listener.as_ref()).await;
        }));
    }

    /// Install, replace or cancel the periodic sync. Keeps the existing job
    /// when the schedule did not change.
    pub async fn set_schedule(&self, schedule: SyncSchedule) -> Result<(), SyncError> {
        let mut periodic = self.periodic.lock().await;
        if periodic.as_ref().map(|p| p.schedule) == Some(schedule) {
            return Ok(());
        }

        if let Some(existing) = periodic.take() {
            self.cron
                .remove(&existing.id)
                .await
                .map_err(|e| SyncError::Scheduler(e.to_string()))?;
            info!(schedule = %existing.schedule, "Periodic sync cancelled");
        }

        let Some(interval) = schedule.interval() else {
            return Ok(());
        };

        let orchestrator = self.orchestrator.clone();
        let listener = self.listener.clone();
        let shutdown = self.shutdown.clone();
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let orchestrator = orchestrator.with_cancel(shutdown.child_token());
            let listener = listener.clone();
            Box::pin(async move {
                info!(operation = "scheduled_sync_start", "Starting scheduled sync");
                run_logged(&orchestrator, SyncRequest::periodic(), listener.as_ref()).await;
            })
        })
        .map_err(|e| SyncError::Scheduler(e.to_string()))?;

        let id = self
            .cron
            .add(job)
            .await
            .map_err(|e| SyncError::Scheduler(e.to_string()))?;
        info!(
            schedule = %schedule,
            interval_secs = interval.as_secs(),
            "Periodic sync scheduled"
        );
        *periodic = Some(PeriodicJob { schedule, id });
        Ok(())
    }

    pub async fn schedule(&self) -> SyncSchedule {
        self.periodic
            .lock()
            .await
            .as_ref()
            .map(|p| p.schedule)
            .unwrap_or_default()
    }

    /// Wait for queued one-off and quick syncs to finish.
    pub async fn join(&self) {
        let one_off = self.one_off.lock().await.take();
        let quick = self.quick.lock().await.take();
        for handle in [one_off, quick].into_iter().flatten() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }

    /// Cancel running syncs and stop the periodic job.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.shutdown.cancel();
        self.join().await;
        if self.started.swap(false, Ordering::SeqCst) {
            let mut cron = self.cron.clone();
            cron.shutdown()
                .await
                .map_err(|e| SyncError::Scheduler(e.to_string()))?;
        }
        info!(operation = "scheduler_stopped", "Sync scheduler stopped");
        Ok(())
    }
}

async fn run_logged(
    orchestrator: &SyncOrchestrator,
    request: SyncRequest,
    listener: &dyn SyncListener,
) {
    match orchestrator.run(request, listener).await {
        Ok(_) | Err(SyncError::Cancelled) => {}
        // The orchestrator already notified and logged the failure
        Err(e) => debug!(error = %e, "Background sync failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SyncContext;
    use crate::sync::SyncEvent;
    use crate::testing::{options, FakeRemote, RecordingListener};
    use media_sync_config::{CredentialStore, SyncOptions};
    use media_sync_sources::SourceError;
    use media_sync_store::LocalStore;
    use tempfile::TempDir;

    fn orchestrator(
        remote: Arc<FakeRemote>,
        options: SyncOptions,
        dir: &TempDir,
    ) -> SyncOrchestrator {
        let credentials = CredentialStore::new(dir.path().join("credentials.toml"));
        let ctx = SyncContext::new(LocalStore::in_memory(), remote, options);
        SyncOrchestrator::new(ctx, Arc::new(Mutex::new(credentials)))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_one_off_sync_keeps_running_request() {
        let remote = FakeRemote::default();
        remote.fail("fetch_watched", SourceError::Network("reset".to_string()));
        let mut options = options();
        // Park the first run in its retry delay
        options.retry.retry_delay_ms = 60_000;
        let dir = TempDir::new().unwrap();
        let listener = Arc::new(RecordingListener::default());
        let scheduler = SyncScheduler::new(orchestrator(Arc::new(remote), options, &dir), listener.clone())
            .await
            .unwrap();

        assert!(scheduler.request_sync(SyncRequest::manual()).await);
        assert!(!scheduler.request_sync(SyncRequest::manual()).await);

        scheduler.shutdown().await.unwrap();
        let starts = listener.events().iter().filter(|e| **e == SyncEvent::SyncStart).count();
        assert!(starts <= 1);
        assert!(!listener.events().contains(&SyncEvent::SyncError));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_finished_one_off_accepts_new_request() {
        let dir = TempDir::new().unwrap();
        let listener = Arc::new(RecordingListener::default());
        let scheduler = SyncScheduler::new(
            orchestrator(Arc::new(FakeRemote::default()), options(), &dir),
            listener.clone(),
        )
        .await
        .unwrap();

        assert!(scheduler.request_sync(SyncRequest::manual()).await);
        scheduler.join().await;
        assert!(scheduler.request_sync(SyncRequest::manual()).await);
        scheduler.join().await;

        let successes = listener.events().iter().filter(|e| **e == SyncEvent::SyncSuccess).count();
        assert_eq!(successes, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_schedule_changes() {
        let dir = TempDir::new().unwrap();
        let scheduler = SyncScheduler::new(
            orchestrator(Arc::new(FakeRemote::default()), options(), &dir),
            Arc::new(RecordingListener::default()),
        )
        .await
        .unwrap();

        scheduler.set_schedule(SyncSchedule::Every6Hours).await.unwrap();
        assert_eq!(scheduler.schedule().await, SyncSchedule::Every6Hours);

        scheduler.set_schedule(SyncSchedule::Daily).await.unwrap();
        assert_eq!(scheduler.schedule().await, SyncSchedule::Daily);

        scheduler.set_schedule(SyncSchedule::Off).await.unwrap();
        assert_eq!(scheduler.schedule().await, SyncSchedule::Off);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quick_sync_requests_run_in_order() {
        let remote = Arc::new(FakeRemote::default());
        let dir = TempDir::new().unwrap();
        let listener = Arc::new(RecordingListener::default());
        let mut options = options();
        options.quick_sync_delay_secs = 0;
        let scheduler = SyncScheduler::new(orchestrator(remote, options, &dir), listener.clone())
            .await
            .unwrap();

        scheduler.request_quick_sync().await;
        scheduler.request_quick_sync().await;
        scheduler.join().await;

        // Nothing pending: both runs finish without an event or an error
        assert!(listener.events().is_empty());
        assert_eq!(listener.dismissed().len(), 2);
    }
}
