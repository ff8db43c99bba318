//! Fetch command - download installer payloads without installing.
//!
//! Useful for preparing an offline bundle: point `resources.fallback_dir`
//! at the destination directory on the target machine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use setupkit::catalog::TaskDescriptor;
use setupkit::download::{
    BatchDownloader, BatchEntry, BatchProgressCallback, DownloadError, HttpDownloader,
};
use setupkit::probe::HostInfo;
use setupkit::strategy::{PayloadVerifier, StrategyRegistry};
use tracing::{info, warn};

use super::common::select_products;
use crate::error::CliError;
use crate::runner::CliRunner;

const FETCH_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}";

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub names: Vec<String>,
    pub all: bool,
    pub catalog: Option<PathBuf>,
    pub dest: Option<PathBuf>,
    pub parallel: Option<usize>,
}

/// Run the fetch command.
pub fn run(runner: CliRunner, args: FetchArgs) -> Result<(), CliError> {
    runner.log_startup("fetch");
    let config = runner.config().clone();

    let catalog = runner.catalog(args.catalog.as_deref())?;
    let selection = select_products(&catalog, &args.names, args.all)?;
    let dest = args.dest.unwrap_or_else(|| PathBuf::from("."));
    let parallel = args
        .parallel
        .unwrap_or(config.download.max_concurrent_downloads)
        .max(1);

    let entries = batch_entries(&selection, &HostInfo::detect(), &dest)?;
    let total = entries.len();
    println!(
        "Fetching {} payloads into {} ({} at a time)",
        total,
        dest.display(),
        parallel
    );

    let cancel = runner.cancel_on_ctrl_c()?;
    let runtime = runner.runtime()?;

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template(FETCH_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results = runtime.block_on(async {
        let fetcher = HttpDownloader::with_config(
            config
                .download_config()
                .with_max_concurrent_downloads(parallel),
        )
        .map_err(|e| CliError::Config(e.to_string()))?;
        let batch = BatchDownloader::new(Arc::new(fetcher));

        let progress = bar.clone();
        let on_progress: BatchProgressCallback = Box::new(
            move |completed: usize,
                  _total: usize,
                  id: &str,
                  result: &Result<PathBuf, DownloadError>| {
                progress.set_position(completed as u64);
                match result {
                    Ok(_) => progress.set_message(id.to_string()),
                    Err(_) => progress.println(format!("{} {}", style("failed:").red(), id)),
                }
            },
        );

        let results = batch
            .fetch_all(entries, parallel, Some(on_progress), &cancel)
            .await;
        Ok::<_, CliError>(results)
    })?;
    bar.finish_and_clear();

    let verifier = PayloadVerifier::new()
        .with_min_size(config.download.min_payload_bytes)
        .with_size_tolerance(config.download.size_tolerance);

    let mut failed = 0;
    for task in &selection {
        match results.get(&task.name) {
            Some(Ok(path)) => match runtime.block_on(verifier.verify(path, task)) {
                Ok(bytes) => {
                    println!("  {} {:<28} {}", style("✓").green(), task.name, path.display());
                    info!(product = %task.name, bytes, path = %path.display(), "payload fetched");
                }
                Err(e) => {
                    failed += 1;
                    println!("  {} {:<28} {}", style("✗").red(), task.name, e);
                    warn!(product = %task.name, error = %e, "fetched payload failed verification");
                }
            },
            Some(Err(e)) => {
                failed += 1;
                println!("  {} {:<28} {}", style("✗").red(), task.name, e);
            }
            None => {}
        }
    }

    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }
    if failed > 0 {
        return Err(CliError::FetchFailed { failed, total });
    }
    Ok(())
}

/// One batch entry per product, URLs resolved for this host.
fn batch_entries(
    selection: &[Arc<TaskDescriptor>],
    host: &HostInfo,
    dest: &Path,
) -> Result<BTreeMap<String, BatchEntry>, CliError> {
    let registry = StrategyRegistry::with_defaults();
    let mut entries = BTreeMap::new();
    for task in selection {
        let variant = registry.variant(task.kind).ok_or_else(|| {
            CliError::Config(format!("No installer variant for {}", task.kind))
        })?;
        let url = variant
            .resolve_url(task, host)
            .map_err(|e| CliError::Config(format!("{}: {}", task.name, e)))?;
        entries.insert(
            task.name.clone(),
            BatchEntry::new(url, dest.join(&task.file_name)),
        );
    }
    Ok(entries)
}
