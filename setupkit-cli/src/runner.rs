//! Shared setup for commands that do real work.
//!
//! Loads the configuration, starts logging and builds the async runtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use setupkit::catalog::Catalog;
use setupkit::config::ConfigFile;
use setupkit::logging::{self, LogGuard};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Owns the configuration and the logging guard for one CLI invocation.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    _log_guard: LogGuard,
}

impl CliRunner {
    /// Load configuration and initialise logging.
    ///
    /// With `verbose`, log lines also go to stderr at debug level.
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;
        let mut logging = config.logging_config().with_console(verbose);
        if verbose {
            logging.level = "debug".to_string();
        }
        let log_guard = logging::init(&logging)?;

        Ok(Self {
            config,
            config_path: resolve_config_path(config_path),
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %self.config_path.display(),
            "setupkit starting"
        );
    }

    /// Catalog from `--catalog`, then the config file, then the built-in one.
    pub fn catalog(&self, cli_path: Option<&Path>) -> Result<Catalog, CliError> {
        let path = cli_path.or(self.config.resources.catalog.as_deref());
        Ok(Catalog::load_or_builtin(path)?)
    }

    /// Multi-threaded runtime for the async library.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("setupkit-worker")
            .build()
            .map_err(CliError::Runtime)
    }

    /// Token cancelled by Ctrl-C.
    ///
    /// The first Ctrl-C cancels cooperatively; a second one exits at once.
    pub fn cancel_on_ctrl_c(&self) -> Result<CancellationToken, CliError> {
        let cancel = CancellationToken::new();
        let handler_token = cancel.clone();
        let presses = AtomicUsize::new(0);

        ctrlc::set_handler(move || {
            let count = presses.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                eprintln!();
                eprintln!("Cancelling... press Ctrl+C again to exit immediately");
                handler_token.cancel();
            } else {
                std::process::exit(130);
            }
        })
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

        Ok(cancel)
    }
}
