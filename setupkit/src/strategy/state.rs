//! Observable per-task progress.

use std::sync::Arc;

use tokio::sync::watch;

/// Snapshot of a strategy's progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StrategyState {
    /// 0-100; never decreases within an attempt.
    pub progress: u8,
    /// Human-readable description of the current step.
    pub status: String,
    /// True while an attempt is running.
    pub in_progress: bool,
    /// 1-based number of the current or last attempt; 0 before the first.
    pub attempt: u32,
}

/// Write side of a strategy's state channel.
///
/// Cloning shares the channel, so download progress callbacks can report
/// from the fetch task.
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<StrategyState>>,
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StrategyState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn snapshot(&self) -> StrategyState {
        self.tx.borrow().clone()
    }

    /// New receiver for observers.
    pub fn subscribe(&self) -> watch::Receiver<StrategyState> {
        self.tx.subscribe()
    }

    /// Reset progress for a new attempt.
    pub fn begin_attempt(&self) {
        self.tx.send_modify(|s| {
            s.progress = 0;
            s.status = "starting".to_string();
            s.in_progress = true;
            s.attempt += 1;
        });
    }

    /// Move progress forward and update the status text.
    ///
    /// A lower `progress` than the current value keeps the current value.
    pub fn advance(&self, progress: u8, status: impl Into<String>) {
        let progress = progress.min(100);
        let status = status.into();
        self.tx.send_modify(|s| {
            s.progress = s.progress.max(progress);
            s.status = status;
        });
    }

    /// Move progress forward without touching the status text.
    ///
    /// Observers are only woken when the value actually changes.
    pub fn advance_progress(&self, progress: u8) {
        let progress = progress.min(100);
        self.tx.send_if_modified(|s| {
            if progress > s.progress {
                s.progress = progress;
                true
            } else {
                false
            }
        });
    }

    /// Mark the attempt finished.
    pub fn finish(&self, status: impl Into<String>) {
        let status = status.into();
        self.tx.send_modify(|s| {
            s.status = status;
            s.in_progress = false;
        });
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}
