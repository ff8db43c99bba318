//! Tracing subscriber setup.
//!
//! Two outputs: a daily-rotated log file (non-blocking, no ANSI) and an
//! optional stderr console layer. `RUST_LOG` overrides the configured level.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILE_PREFIX: &str = "setupkit.log";

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// What to log and where.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `setupkit=debug`.
    pub level: String,
    /// Directory for rotated log files. No file output when `None`.
    pub directory: Option<PathBuf>,
    /// Log file name prefix; the date is appended.
    pub file_prefix: String,
    /// Also log to stderr.
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            directory: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            console: false,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Env filter from `RUST_LOG`, else the configured level, else `info`.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Keeps the file writer flushing. Drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<LogGuard, LoggingError> {
    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(LocalTime::rfc_3339())
    });

    tracing_subscriber::registry()
        .with(config.filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LogGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LoggingConfig::new("debug")
            .with_directory("/var/log/setupkit")
            .with_console(true);
        assert_eq!(config.level, "debug");
        assert_eq!(config.directory, Some(PathBuf::from("/var/log/setupkit")));
        assert_eq!(config.file_prefix, "setupkit.log");
        assert!(config.console);
    }

    #[test]
    fn test_default_has_no_outputs() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.directory.is_none());
        assert!(!config.console);
    }

    #[test]
    fn test_init_creates_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        let config = LoggingConfig::new("info").with_directory(&dir);

        let guard = init(&config).unwrap();
        tracing::info!("logging initialised");
        assert!(dir.is_dir());

        assert!(matches!(
            init(&LoggingConfig::default()),
            Err(LoggingError::AlreadyInitialized(_))
        ));
        drop(guard);
    }
}
