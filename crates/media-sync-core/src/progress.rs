use std::time::Instant;
use tracing::{info, warn};

const DEFAULT_INTERVAL: usize = 50;

/// Periodic progress and a final summary for passes over many items.
pub struct ProgressTracker {
    operation: &'static str,
    total: usize,
    added: usize,
    already_present: usize,
    skipped: usize,
    failed: usize,
    started: Instant,
    interval: usize,
    last_logged: usize,
}

impl ProgressTracker {
    pub fn new(operation: &'static str, total: usize) -> Self {
        Self {
            operation,
            total,
            added: 0,
            already_present: 0,
            skipped: 0,
            failed: 0,
            started: Instant::now(),
            interval: DEFAULT_INTERVAL,
            last_logged: 0,
        }
    }

    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn record_added(&mut self) {
        self.added += 1;
    }

    pub fn record_already_present(&mut self) {
        self.already_present += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn added(&self) -> usize {
        self.added
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Call after each item with its 1-based position.
    pub fn tick(&mut self, current: usize) {
        if current.saturating_sub(self.last_logged) < self.interval && current != self.total {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        // Instant passes are noise
        if elapsed < 0.5 && current < self.total {
            return;
        }
        info!(
            operation = self.operation,
            current,
            total = self.total,
            added = self.added,
            already_present = self.already_present,
            skipped = self.skipped,
            failed = self.failed,
            "Progress: {}/{}",
            current,
            self.total
        );
        self.last_logged = current;
    }

    pub fn finish(&self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if self.failed > 0 {
            warn!(
                operation = self.operation,
                total = self.total,
                added = self.added,
                already_present = self.already_present,
                skipped = self.skipped,
                failed = self.failed,
                "{} completed with failures in {:.1}s",
                self.operation,
                elapsed
            );
        } else if self.total > 0 {
            info!(
                operation = self.operation,
                total = self.total,
                added = self.added,
                already_present = self.already_present,
                skipped = self.skipped,
                "{} completed in {:.1}s",
                self.operation,
                elapsed
            );
        }
    }
}
