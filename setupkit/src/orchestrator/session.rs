//! Installation sessions.
//!
//! A session takes a selection of strategies and runs them in priority
//! order, in groups of at most `max_concurrent_installations`:
//!
//! ```text
//! run(strategies, cancel)
//!   │
//!   ├─ plan_groups (priority desc, stable)
//!   │
//!   ├─ for each group:
//!   │     wait while paused / stop if cancelled
//!   │     spawn every task ─► attempt ─► retry delay ─► attempt ...
//!   │     barrier: await all, emit batch progress as each finishes
//!   │     global progress = completed * 100 / total
//!   │
//!   └─ fill never-started tasks as Cancelled ─► SessionSummary
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Local;
use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::OrchestratorConfig;
use super::error::RunError;
use super::events::{NullSink, ProgressSink};
use super::policy::RetryPolicy;
use super::schedule::plan_groups;
use super::types::{SessionState, SessionSummary, TaskResult};
use crate::strategy::{InstallerStrategy, StrategyState};

/// Runs installation sessions.
///
/// One session at a time; a finished orchestrator can run again. Control
/// methods ([`pause`](Self::pause), [`resume`](Self::resume),
/// [`cancel`](Self::cancel)) may be called from other tasks while
/// [`run`](Self::run) is in progress, so callers typically hold it in an
/// `Arc`.
pub struct InstallOrchestrator {
    config: OrchestratorConfig,
    sink: Arc<dyn ProgressSink>,
    state: watch::Sender<SessionState>,
    progress: AtomicU8,
    session_cancel: Mutex<Option<CancellationToken>>,
    active: Arc<DashMap<String, Arc<dyn InstallerStrategy>>>,
}

impl InstallOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_sink(config, Arc::new(NullSink))
    }

    pub fn with_sink(config: OrchestratorConfig, sink: Arc<dyn ProgressSink>) -> Self {
        let (state, _rx) = watch::channel(SessionState::Idle);
        Self {
            config,
            sink,
            state,
            progress: AtomicU8::new(0),
            session_cancel: Mutex::new(None),
            active: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Global progress of the current or last session, 0-100.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// Progress snapshots of tasks currently running.
    pub fn active_tasks(&self) -> Vec<(String, StrategyState)> {
        let mut tasks: Vec<_> = self
            .active
            .iter()
            .map(|e| (e.key().clone(), e.value().state()))
            .collect();
        tasks.sort_by(|a, b| a.0.cmp(&b.0));
        tasks
    }

    /// Hold back the next group. Running tasks are not interrupted.
    ///
    /// Returns false when no session is running.
    pub fn pause(&self) -> bool {
        let paused = self.state.send_if_modified(|s| {
            if *s == SessionState::Running {
                *s = SessionState::Paused;
                true
            } else {
                false
            }
        });
        if paused {
            info!("session paused");
            self.sink.on_session_state(SessionState::Paused);
        }
        paused
    }

    /// Let a paused session continue.
    pub fn resume(&self) -> bool {
        let resumed = self.state.send_if_modified(|s| {
            if *s == SessionState::Paused {
                *s = SessionState::Running;
                true
            } else {
                false
            }
        });
        if resumed {
            info!("session resumed");
            self.sink.on_session_state(SessionState::Running);
        }
        resumed
    }

    /// Request cancellation of the current session.
    ///
    /// Returns false when no session is active.
    pub fn cancel(&self) -> bool {
        match self.session_cancel.lock().as_ref() {
            Some(token) => {
                info!("session cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one session over `strategies` and summarise it.
    ///
    /// Fails only when the session cannot start. Every strategy gets an
    /// entry in the summary, whatever happens during the run.
    pub async fn run(
        &self,
        strategies: Vec<Arc<dyn InstallerStrategy>>,
        cancel: CancellationToken,
    ) -> Result<SessionSummary, RunError> {
        if self.state().is_active() {
            return Err(RunError::AlreadyRunning);
        }
        if strategies.is_empty() {
            return Err(RunError::EmptySelection);
        }
        if let Some(name) = first_duplicate(&strategies) {
            return Err(RunError::DuplicateTask(name));
        }
        self.begin()?;
        *self.session_cancel.lock() = Some(cancel.clone());

        let started_at = Local::now();
        let total = strategies.len();
        let priorities: Vec<_> = strategies.iter().map(|s| s.descriptor().priority).collect();
        let groups = plan_groups(&priorities, self.config.max_concurrent_installations);
        info!(
            tasks = total,
            groups = groups.len(),
            max_concurrent = self.config.max_concurrent_installations,
            max_retries = self.config.max_retry_count(),
            "installation session started"
        );

        let attempts: Arc<DashMap<String, u32>> = Arc::new(DashMap::new());
        let mut results: BTreeMap<String, TaskResult> = BTreeMap::new();
        let mut completed = 0usize;

        for (index, group) in groups.iter().enumerate() {
            if !self.wait_while_paused(&cancel).await {
                info!(remaining_groups = groups.len() - index, "session cancelled before group");
                break;
            }
            debug!(group = index + 1, size = group.len(), "starting group");

            let mut running: FuturesUnordered<_> = group
                .iter()
                .map(|&i| {
                    let strategy = Arc::clone(&strategies[i]);
                    let name = strategy.name().to_string();
                    self.active.insert(name.clone(), Arc::clone(&strategy));

                    let handle = tokio::spawn(run_task(
                        strategy,
                        self.config.retry.clone(),
                        Arc::clone(&self.sink),
                        Arc::clone(&attempts),
                        cancel.clone(),
                    ));
                    async move { (name, handle.await) }
                })
                .collect();

            while let Some((name, joined)) = running.next().await {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        error!(task = %name, panicked = e.is_panic(), error = %e, "install task aborted");
                        TaskResult::Error
                    }
                };
                self.active.remove(&name);
                completed += 1;
                self.sink.on_batch_progress(completed, total, &name, result);
                results.insert(name, result);
            }

            let progress = (completed * 100 / total) as u8;
            self.progress.store(progress, Ordering::Release);
            debug!(group = index + 1, completed, total, progress, "group finished");
        }

        for strategy in &strategies {
            results
                .entry(strategy.name().to_string())
                .or_insert(TaskResult::Cancelled);
        }
        let attempts: BTreeMap<String, u32> = strategies
            .iter()
            .map(|s| {
                let name = s.name().to_string();
                let count = attempts.get(&name).map(|c| *c).unwrap_or(0);
                (name, count)
            })
            .collect();

        let summary = SessionSummary::new(
            results,
            attempts,
            cancel.is_cancelled(),
            started_at,
            Local::now(),
        );
        self.finish();

        info!(
            succeeded = summary.success_count,
            failed = summary.failure_count,
            cancelled = summary.cancelled,
            duration_ms = summary.duration().as_millis() as u64,
            "installation session finished"
        );
        self.sink.on_session_complete(&summary);
        Ok(summary)
    }

    fn begin(&self) -> Result<(), RunError> {
        let started = self.state.send_if_modified(|s| {
            if s.is_active() {
                false
            } else {
                *s = SessionState::Running;
                true
            }
        });
        if !started {
            return Err(RunError::AlreadyRunning);
        }
        self.progress.store(0, Ordering::Release);
        self.sink.on_session_state(SessionState::Running);
        Ok(())
    }

    fn finish(&self) {
        self.session_cancel.lock().take();
        self.active.clear();
        self.state.send_replace(SessionState::Completed);
        self.sink.on_session_state(SessionState::Completed);
    }

    /// Block while paused. Returns false once cancellation is requested.
    async fn wait_while_paused(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.state.subscribe();
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if *rx.borrow_and_update() != SessionState::Paused {
                return true;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return true;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for InstallOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallOrchestrator")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

/// Name of the first strategy whose name was already seen.
///
/// Results and attempts are keyed by name, so names must be unique.
fn first_duplicate(strategies: &[Arc<dyn InstallerStrategy>]) -> Option<String> {
    let mut seen = HashSet::with_capacity(strategies.len());
    strategies
        .iter()
        .map(|s| s.name())
        .find(|name| !seen.insert(*name))
        .map(str::to_string)
}

/// Attempt a task until it succeeds, runs out of retries, or the session
/// is cancelled. Returns the last attempt's result.
async fn run_task(
    strategy: Arc<dyn InstallerStrategy>,
    retry: RetryPolicy,
    sink: Arc<dyn ProgressSink>,
    attempts: Arc<DashMap<String, u32>>,
    cancel: CancellationToken,
) -> TaskResult {
    let name = strategy.name().to_string();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        attempts.insert(name.clone(), attempt);
        sink.on_task_started(&name, attempt);

        let result = install_with_progress(strategy.as_ref(), sink.as_ref(), &cancel).await;

        if !result.is_retryable() || cancel.is_cancelled() {
            return result;
        }
        let Some(delay) = retry.delay_for_retry(attempt) else {
            return result;
        };

        warn!(
            task = %name,
            attempt,
            %result,
            delay_ms = delay.as_millis() as u64,
            "install attempt failed, retrying"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return result,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Run one attempt, relaying its state changes to the sink.
async fn install_with_progress(
    strategy: &dyn InstallerStrategy,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> TaskResult {
    let name = strategy.name();
    let mut rx = strategy.subscribe();
    let relay = async {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            sink.on_task_progress(name, state.progress, &state.status);
        }
        // Sender lives as long as the strategy; park instead of finishing.
        futures::future::pending::<()>().await
    };

    let result = tokio::select! {
        biased;
        result = strategy.install(cancel) => result,
        _ = relay => TaskResult::Error,
    };

    let last = strategy.state();
    sink.on_task_progress(name, last.progress, &last.status);
    result
}
