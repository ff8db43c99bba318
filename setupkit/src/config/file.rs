//! `config.ini` loading and saving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::keys::ConfigKey;
use super::paths::{config_file_path, default_log_dir};
use crate::context::DEFAULT_INSTALL_TIMEOUT;
use crate::download::DownloadConfig;
use crate::logging::LoggingConfig;
use crate::orchestrator::{
    OrchestratorConfig, DEFAULT_MAX_CONCURRENT_INSTALLATIONS, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY_SECS,
};
use crate::strategy::{DEFAULT_MIN_PAYLOAD_BYTES, DEFAULT_SIZE_TOLERANCE};

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[install]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallSettings {
    pub max_concurrent_installations: usize,
    pub max_retry_count: u32,
    pub retry_delay_secs: u64,
    pub install_timeout_secs: u64,
    /// Run installers elevated.
    pub elevate: bool,
    /// Kill running installers on cancellation.
    pub hard_cancel: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            max_concurrent_installations: DEFAULT_MAX_CONCURRENT_INSTALLATIONS,
            max_retry_count: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            install_timeout_secs: DEFAULT_INSTALL_TIMEOUT.as_secs(),
            elevate: true,
            hard_cancel: false,
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub max_concurrent_downloads: usize,
    pub timeout_secs: u64,
    /// Where payloads are staged; a temp directory when unset.
    pub staging_dir: Option<PathBuf>,
    pub min_payload_bytes: u64,
    pub size_tolerance: f64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        let download = DownloadConfig::default();
        Self {
            max_concurrent_downloads: download.max_concurrent_downloads,
            timeout_secs: download.timeout.as_secs(),
            staging_dir: None,
            min_payload_bytes: DEFAULT_MIN_PAYLOAD_BYTES,
            size_tolerance: DEFAULT_SIZE_TOLERANCE,
        }
    }
}

/// `[resources]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSettings {
    /// Directory of bundled offline installers.
    pub fallback_dir: Option<PathBuf>,
    /// Catalog file; the built-in catalog when unset.
    pub catalog: Option<PathBuf>,
    /// Where post-install product settings are written.
    pub settings_dir: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file directory; the platform data directory when unset.
    pub directory: Option<PathBuf>,
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: "info".to_string(),
        }
    }
}

/// The SetupKit configuration file.
///
/// Missing sections and keys keep their defaults; a present but
/// unparseable value is an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub install: InstallSettings,
    pub download: DownloadSettings,
    pub resources: ResourceSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults when the file does not
    /// exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific file, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini.write_to_file(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Session limits for the orchestrator.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_max_concurrent_installations(self.install.max_concurrent_installations)
            .with_retries(
                self.install.max_retry_count,
                Duration::from_secs(self.install.retry_delay_secs),
            )
    }

    /// HTTP settings for the downloader.
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig::default()
            .with_timeout(Duration::from_secs(self.download.timeout_secs))
            .with_max_concurrent_downloads(self.download.max_concurrent_downloads)
    }

    /// Log setup.
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::new(self.logging.level.clone()).with_directory(
            self.logging
                .directory
                .clone()
                .unwrap_or_else(default_log_dir),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.install.max_concurrent_installations, 3);
        assert_eq!(config.install.max_retry_count, 2);
        assert_eq!(config.install.retry_delay_secs, 2);
        assert_eq!(config.install.install_timeout_secs, 600);
        assert_eq!(config.download.min_payload_bytes, 1024);
        assert_eq!(config.download.size_tolerance, 0.1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ConfigFile::parse(
            "[install]\nmax_concurrent_installations = 5\n\n[resources]\nfallback_dir = /opt/bundle\n",
        )
        .unwrap();

        assert_eq!(config.install.max_concurrent_installations, 5);
        assert_eq!(config.install.max_retry_count, 2);
        assert_eq!(config.resources.fallback_dir, Some(PathBuf::from("/opt/bundle")));
        assert_eq!(config.resources.catalog, None);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = ConfigFile::parse("[install]\nmax_retry_count = lots\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "install.max_retry_count");
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.install.hard_cancel = true;
        config.download.staging_dir = Some(temp.path().join("staging"));
        config.logging.level = "debug".to_string();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_conversions() {
        let mut config = ConfigFile::default();
        config.install.max_concurrent_installations = 4;
        config.install.max_retry_count = 1;
        config.install.retry_delay_secs = 7;
        config.download.max_concurrent_downloads = 2;
        config.download.timeout_secs = 30;

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.max_concurrent_installations, 4);
        assert_eq!(orchestrator.max_retry_count(), 1);
        assert_eq!(
            orchestrator.retry.delay_for_retry(1),
            Some(Duration::from_secs(7))
        );

        let download = config.download_config();
        assert_eq!(download.max_concurrent_downloads, 2);
        assert_eq!(download.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(matches!(
            ConfigFile::load_from(Path::new("/nonexistent/config.ini")),
            Err(ConfigError::Read { .. })
        ));
    }
}
