//! Session observers.
//!
//! The orchestrator reports through a [`ProgressSink`]. Every method has a
//! no-op default so sinks implement only what they display.

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::types::{SessionState, SessionSummary, TaskResult};

/// Receives session progress.
///
/// Methods are called from runtime worker threads and must not block.
pub trait ProgressSink: Send + Sync {
    /// A task attempt is starting (`attempt` is 1-based).
    fn on_task_started(&self, _task: &str, _attempt: u32) {}

    /// A running task moved forward.
    fn on_task_progress(&self, _task: &str, _percent: u8, _message: &str) {}

    /// A task reached its final result; `completed` counts finished tasks.
    fn on_batch_progress(
        &self,
        _completed: usize,
        _total: usize,
        _task: &str,
        _result: TaskResult,
    ) {
    }

    /// The session changed state.
    fn on_session_state(&self, _state: SessionState) {}

    /// The session ended. Called exactly once per run.
    fn on_session_complete(&self, _summary: &SessionSummary) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Session progress as a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TaskStarted {
        task: String,
        attempt: u32,
    },
    TaskProgress {
        task: String,
        percent: u8,
        message: String,
    },
    BatchProgress {
        completed: usize,
        total: usize,
        task: String,
        result: TaskResult,
    },
    StateChanged(SessionState),
    Completed(SessionSummary),
}

/// Forwards events to an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn on_task_started(&self, task: &str, attempt: u32) {
        self.send(SessionEvent::TaskStarted {
            task: task.to_string(),
            attempt,
        });
    }

    fn on_task_progress(&self, task: &str, percent: u8, message: &str) {
        self.send(SessionEvent::TaskProgress {
            task: task.to_string(),
            percent,
            message: message.to_string(),
        });
    }

    fn on_batch_progress(&self, completed: usize, total: usize, task: &str, result: TaskResult) {
        self.send(SessionEvent::BatchProgress {
            completed,
            total,
            task: task.to_string(),
            result,
        });
    }

    fn on_session_state(&self, state: SessionState) {
        self.send(SessionEvent::StateChanged(state));
    }

    fn on_session_complete(&self, summary: &SessionSummary) {
        self.send(SessionEvent::Completed(summary.clone()));
    }
}

/// Writes events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_task_started(&self, task: &str, attempt: u32) {
        info!(task, attempt, "task started");
    }

    fn on_task_progress(&self, task: &str, percent: u8, message: &str) {
        debug!(task, percent, message, "task progress");
    }

    fn on_batch_progress(&self, completed: usize, total: usize, task: &str, result: TaskResult) {
        info!(task, %result, completed, total, "task finished");
    }

    fn on_session_state(&self, state: SessionState) {
        info!(%state, "session state changed");
    }

    fn on_session_complete(&self, summary: &SessionSummary) {
        info!(
            succeeded = summary.success_count,
            failed = summary.failure_count,
            cancelled = summary.cancelled,
            duration_secs = summary.duration().as_secs(),
            "session complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();

        sink.on_session_state(SessionState::Running);
        sink.on_task_started("a", 1);
        sink.on_task_progress("a", 50, "downloading");
        sink.on_batch_progress(1, 1, "a", TaskResult::Success);

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::StateChanged(SessionState::Running)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::TaskStarted {
                task: "a".into(),
                attempt: 1
            }
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::TaskProgress { percent: 50, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::BatchProgress {
                completed: 1,
                result: TaskResult::Success,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_session_state(SessionState::Completed);
    }

    #[test]
    fn test_default_methods_are_noops() {
        let sink = NullSink;
        sink.on_task_progress("a", 10, "x");
        TracingSink.on_session_state(SessionState::Paused);
    }
}
