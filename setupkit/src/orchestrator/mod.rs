//! Installation orchestration.
//!
//! Turns a selection of [`InstallerStrategy`](crate::strategy::InstallerStrategy)s
//! into a session: priority-ordered, run in concurrency-bounded groups,
//! retried on failure, pausable and cancellable, summarised at the end.
//!
//! # Example
//!
//! ```ignore
//! let ctx = Arc::new(InstallContext::from_config(&config)?);
//! let selection = catalog.select(&["7-Zip", "Mozilla Firefox"])?;
//! let strategies = StrategyRegistry::with_defaults().build_all(&selection, &ctx)?;
//!
//! let orchestrator = InstallOrchestrator::new(config.orchestrator_config());
//! let summary = orchestrator.run(strategies, CancellationToken::new()).await?;
//! println!("{} installed, {} failed", summary.success_count, summary.failure_count);
//! ```

mod config;
mod error;
mod events;
mod policy;
mod schedule;
mod session;
mod types;

pub use config::{OrchestratorConfig, DEFAULT_MAX_CONCURRENT_INSTALLATIONS};
pub use error::RunError;
pub use events::{ChannelSink, NullSink, ProgressSink, SessionEvent, TracingSink};
pub use policy::{
    Priority, RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS, PRIORITY_NORMAL,
    PRIORITY_OPTIONAL, PRIORITY_SYSTEM,
};
pub use schedule::{install_order, plan_groups};
pub use session::InstallOrchestrator;
pub use types::{SessionState, SessionSummary, TaskResult};
