//! Terminal progress display for installation sessions.
//!
//! Consumes [`SessionEvent`]s from a `ChannelSink` and renders one bar per
//! product plus an overall bar.

use std::collections::HashMap;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use setupkit::orchestrator::{SessionEvent, SessionState};
use setupkit::TaskResult;
use tokio::sync::mpsc::UnboundedReceiver;

const TASK_TEMPLATE: &str = "{prefix:<26.bold} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}";
const OVERALL_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.green/white} {pos}/{len} products {msg}";

/// Multi-bar view of a running session.
pub struct SessionProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    tasks: HashMap<String, ProgressBar>,
}

impl SessionProgress {
    /// Display drawing to stderr.
    pub fn new(total: usize) -> Self {
        Self::with_target(total, ProgressDrawTarget::stderr())
    }

    fn with_target(total: usize, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(style_or_default(OVERALL_TEMPLATE));
        overall.enable_steady_tick(std::time::Duration::from_millis(120));
        Self {
            multi,
            overall,
            tasks: HashMap::new(),
        }
    }

    /// Render events until the session completes or the channel closes.
    pub async fn run(mut self, mut events: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle(event) {
                break;
            }
        }
        if !self.overall.is_finished() {
            self.overall.abandon();
        }
    }

    /// Apply one event. Returns true once the session is complete.
    fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::TaskStarted { task, attempt } => {
                let bar = self.task_bar(&task);
                bar.reset();
                if attempt > 1 {
                    bar.set_message(format!("retry {}", attempt - 1));
                } else {
                    bar.set_message("starting");
                }
            }
            SessionEvent::TaskProgress {
                task,
                percent,
                message,
            } => {
                let bar = self.task_bar(&task);
                if !bar.is_finished() {
                    bar.set_position(u64::from(percent));
                    bar.set_message(message);
                }
            }
            SessionEvent::BatchProgress {
                completed, task, result, ..
            } => {
                let bar = self.task_bar(&task);
                bar.finish_with_message(styled_result(result));
                self.overall.set_position(completed as u64);
            }
            SessionEvent::StateChanged(SessionState::Paused) => {
                self.overall.set_message(style("(paused)").yellow().to_string());
            }
            SessionEvent::StateChanged(_) => {
                self.overall.set_message("");
            }
            SessionEvent::Completed(summary) => {
                self.overall.finish_with_message(format!(
                    "- {} succeeded, {} failed",
                    summary.success_count, summary.failure_count
                ));
                return true;
            }
        }
        false
    }

    fn task_bar(&mut self, task: &str) -> ProgressBar {
        if let Some(bar) = self.tasks.get(task) {
            return bar.clone();
        }
        let bar = self
            .multi
            .insert_before(&self.overall, ProgressBar::new(100));
        bar.set_style(style_or_default(TASK_TEMPLATE).progress_chars("=> "));
        bar.set_prefix(task.to_string());
        self.tasks.insert(task.to_string(), bar.clone());
        bar
    }
}

fn style_or_default(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Colored label for a final result.
pub fn styled_result(result: TaskResult) -> String {
    let label = result.as_str();
    match result {
        TaskResult::Success => style(label).green().to_string(),
        TaskResult::AlreadyInstalled => style(label).dim().to_string(),
        TaskResult::PartialSuccess | TaskResult::Cancelled => style(label).yellow().to_string(),
        _ => style(label).red().to_string(),
    }
}
