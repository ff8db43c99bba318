//! Session result types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Terminal outcome of one install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskResult {
    Success,
    AlreadyInstalled,
    DownloadFailed,
    InstallationFailed,
    SystemRequirementsNotMet,
    /// Installed, but the installer asked for a reboot to finish.
    PartialSuccess,
    /// Unexpected failure, e.g. a panic inside the pipeline.
    Error,
    Cancelled,
}

impl TaskResult {
    /// Counted as a success in the session summary.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success | TaskResult::AlreadyInstalled)
    }

    /// Another attempt might produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TaskResult::Success | TaskResult::AlreadyInstalled | TaskResult::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskResult::Success => "success",
            TaskResult::AlreadyInstalled => "already installed",
            TaskResult::DownloadFailed => "download failed",
            TaskResult::InstallationFailed => "installation failed",
            TaskResult::SystemRequirementsNotMet => "system requirements not met",
            TaskResult::PartialSuccess => "partial success",
            TaskResult::Error => "error",
            TaskResult::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an orchestrator.
///
/// ```text
/// Idle ──► Running ⇄ Paused
///             │
///             ▼
///         Completed ──► Running (next session)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionState {
    /// A session is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Everything a finished session produced.
///
/// `results` holds one entry per selected task, including tasks that never
/// started (recorded as [`TaskResult::Cancelled`]).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Tasks that ended in [`TaskResult::Success`] or
    /// [`TaskResult::AlreadyInstalled`].
    pub success_count: usize,
    /// All other tasks.
    pub failure_count: usize,
    /// Final result per task name.
    pub results: BTreeMap<String, TaskResult>,
    /// Attempts made per task name; zero for tasks never started.
    pub attempts: BTreeMap<String, u32>,
    /// Cancellation was requested during the session.
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl SessionSummary {
    pub fn new(
        results: BTreeMap<String, TaskResult>,
        attempts: BTreeMap<String, u32>,
        cancelled: bool,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> Self {
        let success_count = results.values().filter(|r| r.is_success()).count();
        Self {
            success_count,
            failure_count: results.len() - success_count,
            results,
            attempts,
            cancelled,
            started_at,
            finished_at,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True when every task succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// Failed tasks and their results, in name order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, TaskResult)> {
        self.results
            .iter()
            .filter(|(_, r)| !r.is_success())
            .map(|(n, r)| (n.as_str(), *r))
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}
