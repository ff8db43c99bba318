//! CLI error type.

use std::fmt;

use setupkit::catalog::CatalogError;
use setupkit::config::ConfigError;
use setupkit::context::ContextError;
use setupkit::logging::LoggingError;
use setupkit::orchestrator::RunError;
use setupkit::strategy::RegistryError;

/// Exit code when the user interrupted the run.
const EXIT_INTERRUPTED: u8 = 130;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or missing configuration.
    Config(String),
    ConfigFile(ConfigError),
    Catalog(CatalogError),
    Context(ContextError),
    Registry(RegistryError),
    Logging(LoggingError),
    Session(RunError),
    /// Failed to start the async runtime.
    Runtime(std::io::Error),
    /// The user declined the confirmation prompt.
    Declined,
    /// Ctrl-C stopped the run.
    Interrupted,
    /// Some products did not install.
    InstallFailed { failed: usize, total: usize },
    /// Some payloads did not download.
    FetchFailed { failed: usize, total: usize },
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Interrupted => EXIT_INTERRUPTED,
            CliError::InstallFailed { .. } | CliError::FetchFailed { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::Catalog(e) => write!(f, "Catalog error: {}", e),
            CliError::Context(e) => write!(f, "Setup error: {}", e),
            CliError::Registry(e) => write!(f, "Catalog error: {}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Session(e) => write!(f, "Session error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Declined => write!(f, "Aborted by user"),
            CliError::Interrupted => write!(f, "Interrupted"),
            CliError::InstallFailed { failed, total } => {
                write!(f, "{} of {} products failed to install", failed, total)
            }
            CliError::FetchFailed { failed, total } => {
                write!(f, "{} of {} payloads failed to download", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<ContextError> for CliError {
    fn from(e: ContextError) -> Self {
        CliError::Context(e)
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Registry(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<RunError> for CliError {
    fn from(e: RunError) -> Self {
        CliError::Session(e)
    }
}
