//! Install command - run an installation session.

use std::path::PathBuf;
use std::sync::Arc;

use console::{style, Term};
use dialoguer::Confirm;
use setupkit::catalog::TaskDescriptor;
use setupkit::config::ConfigFile;
use setupkit::orchestrator::{ChannelSink, InstallOrchestrator};
use setupkit::probe::is_elevated;
use setupkit::strategy::StrategyRegistry;
use setupkit::{InstallContext, SessionSummary};
use tracing::{info, warn};

use super::common::{format_size, select_products};
use crate::error::CliError;
use crate::progress::{styled_result, SessionProgress};
use crate::runner::CliRunner;

/// Arguments for the install command.
pub struct InstallArgs {
    pub names: Vec<String>,
    pub all: bool,
    pub catalog: Option<PathBuf>,
    pub max_concurrent: Option<usize>,
    pub retries: Option<u32>,
    pub timeout: Option<u64>,
    pub yes: bool,
}

/// Run the install command.
pub fn run(mut runner: CliRunner, args: InstallArgs) -> Result<(), CliError> {
    runner.log_startup("install");
    apply_overrides(runner.config_mut(), &args);

    let catalog = runner.catalog(args.catalog.as_deref())?;
    let selection = select_products(&catalog, &args.names, args.all)?;
    let config = runner.config().clone();

    print_plan(&selection, &config);
    if !args.yes && !confirm(selection.len())? {
        return Err(CliError::Declined);
    }

    let cancel = runner.cancel_on_ctrl_c()?;
    let runtime = runner.runtime()?;

    let summary = runtime.block_on(async {
        let ctx = Arc::new(InstallContext::from_config(&config)?);
        let strategies = StrategyRegistry::with_defaults().build_all(&selection, &ctx)?;

        let (sink, events) = ChannelSink::new();
        let display = tokio::spawn(SessionProgress::new(strategies.len()).run(events));

        let orchestrator =
            InstallOrchestrator::with_sink(config.orchestrator_config(), Arc::new(sink));
        let summary = orchestrator.run(strategies, cancel).await;
        drop(orchestrator);

        if let Err(e) = display.await {
            warn!(error = %e, "progress display stopped");
        }
        if let Err(e) = ctx.dispose().await {
            warn!(error = %e, "failed to clean staging directory");
        }
        Ok::<SessionSummary, CliError>(summary?)
    })?;

    print_summary(&summary);
    info!(
        succeeded = summary.success_count,
        failed = summary.failure_count,
        cancelled = summary.cancelled,
        "install command finished"
    );

    if summary.cancelled {
        Err(CliError::Interrupted)
    } else if summary.failure_count > 0 {
        Err(CliError::InstallFailed {
            failed: summary.failure_count,
            total: summary.total(),
        })
    } else {
        Ok(())
    }
}

/// CLI flags take precedence over the config file.
fn apply_overrides(config: &mut ConfigFile, args: &InstallArgs) {
    if let Some(max) = args.max_concurrent {
        config.install.max_concurrent_installations = max.max(1);
    }
    if let Some(retries) = args.retries {
        config.install.max_retry_count = retries;
    }
    if let Some(timeout) = args.timeout {
        config.install.install_timeout_secs = timeout.max(1);
    }
}

fn print_plan(selection: &[Arc<TaskDescriptor>], config: &ConfigFile) {
    println!("SetupKit v{}", env!("CARGO_PKG_VERSION"));
    println!("==============");
    println!();
    println!("Products to install ({}):", selection.len());
    for task in selection {
        let size = task
            .expected_size
            .map(|s| format!(" ({})", format_size(s)))
            .unwrap_or_default();
        println!("  {} {}{}", style("•").cyan(), task.name, size);
    }
    println!();
    println!(
        "Concurrency: {} | Retries: {} | Installer timeout: {}s",
        config.install.max_concurrent_installations,
        config.install.max_retry_count,
        config.install.install_timeout_secs
    );
    if config.install.elevate && !is_elevated() {
        println!(
            "{}",
            style("Installers will request elevation; you may be asked for credentials.")
                .yellow()
        );
    }
    println!();
}

fn confirm(count: usize) -> Result<bool, CliError> {
    if !Term::stdout().is_term() {
        return Err(CliError::Config(
            "Not running in a terminal; pass --yes to install without confirmation".to_string(),
        ));
    }
    Confirm::new()
        .with_prompt(format!("Install {} products?", count))
        .default(true)
        .interact()
        .map_err(|e| CliError::Config(format!("Confirmation prompt failed: {}", e)))
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Session Summary");
    println!("───────────────");
    for (name, result) in &summary.results {
        let attempts = summary.attempts.get(name).copied().unwrap_or(0);
        let retries = if attempts > 1 {
            format!(" ({} attempts)", attempts)
        } else {
            String::new()
        };
        println!("  {:<28} {}{}", name, styled_result(*result), retries);
    }
    println!();
    println!(
        "  Succeeded: {}  Failed: {}  Duration: {:.1}s",
        summary.success_count,
        summary.failure_count,
        summary.duration().as_secs_f64()
    );
    if summary.cancelled {
        println!("  {}", style("Session was cancelled").yellow());
    }
}
