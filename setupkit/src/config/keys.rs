//! Addressable configuration keys (`section.key`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigError, ConfigFile};

/// Every setting in `config.ini`, addressable as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    InstallMaxConcurrentInstallations,
    InstallMaxRetryCount,
    InstallRetryDelaySecs,
    InstallTimeoutSecs,
    InstallElevate,
    InstallHardCancel,
    DownloadMaxConcurrentDownloads,
    DownloadTimeoutSecs,
    DownloadStagingDir,
    DownloadMinPayloadBytes,
    DownloadSizeTolerance,
    ResourcesFallbackDir,
    ResourcesCatalog,
    ResourcesSettingsDir,
    LoggingDirectory,
    LoggingLevel,
}

const ALL_KEYS: [ConfigKey; 16] = [
    ConfigKey::InstallMaxConcurrentInstallations,
    ConfigKey::InstallMaxRetryCount,
    ConfigKey::InstallRetryDelaySecs,
    ConfigKey::InstallTimeoutSecs,
    ConfigKey::InstallElevate,
    ConfigKey::InstallHardCancel,
    ConfigKey::DownloadMaxConcurrentDownloads,
    ConfigKey::DownloadTimeoutSecs,
    ConfigKey::DownloadStagingDir,
    ConfigKey::DownloadMinPayloadBytes,
    ConfigKey::DownloadSizeTolerance,
    ConfigKey::ResourcesFallbackDir,
    ConfigKey::ResourcesCatalog,
    ConfigKey::ResourcesSettingsDir,
    ConfigKey::LoggingDirectory,
    ConfigKey::LoggingLevel,
];

impl ConfigKey {
    /// All keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::InstallMaxConcurrentInstallations
            | Self::InstallMaxRetryCount
            | Self::InstallRetryDelaySecs
            | Self::InstallTimeoutSecs
            | Self::InstallElevate
            | Self::InstallHardCancel => "install",
            Self::DownloadMaxConcurrentDownloads
            | Self::DownloadTimeoutSecs
            | Self::DownloadStagingDir
            | Self::DownloadMinPayloadBytes
            | Self::DownloadSizeTolerance => "download",
            Self::ResourcesFallbackDir | Self::ResourcesCatalog | Self::ResourcesSettingsDir => {
                "resources"
            }
            Self::LoggingDirectory | Self::LoggingLevel => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::InstallMaxConcurrentInstallations => "max_concurrent_installations",
            Self::InstallMaxRetryCount => "max_retry_count",
            Self::InstallRetryDelaySecs => "retry_delay_secs",
            Self::InstallTimeoutSecs => "install_timeout_secs",
            Self::InstallElevate => "elevate",
            Self::InstallHardCancel => "hard_cancel",
            Self::DownloadMaxConcurrentDownloads => "max_concurrent_downloads",
            Self::DownloadTimeoutSecs => "timeout_secs",
            Self::DownloadStagingDir => "staging_dir",
            Self::DownloadMinPayloadBytes => "min_payload_bytes",
            Self::DownloadSizeTolerance => "size_tolerance",
            Self::ResourcesFallbackDir => "fallback_dir",
            Self::ResourcesCatalog => "catalog",
            Self::ResourcesSettingsDir => "settings_dir",
            Self::LoggingDirectory => "directory",
            Self::LoggingLevel => "level",
        }
    }

    /// `section.key`
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file. Unset paths are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::InstallMaxConcurrentInstallations => {
                config.install.max_concurrent_installations.to_string()
            }
            Self::InstallMaxRetryCount => config.install.max_retry_count.to_string(),
            Self::InstallRetryDelaySecs => config.install.retry_delay_secs.to_string(),
            Self::InstallTimeoutSecs => config.install.install_timeout_secs.to_string(),
            Self::InstallElevate => config.install.elevate.to_string(),
            Self::InstallHardCancel => config.install.hard_cancel.to_string(),
            Self::DownloadMaxConcurrentDownloads => {
                config.download.max_concurrent_downloads.to_string()
            }
            Self::DownloadTimeoutSecs => config.download.timeout_secs.to_string(),
            Self::DownloadStagingDir => path_string(&config.download.staging_dir),
            Self::DownloadMinPayloadBytes => config.download.min_payload_bytes.to_string(),
            Self::DownloadSizeTolerance => config.download.size_tolerance.to_string(),
            Self::ResourcesFallbackDir => path_string(&config.resources.fallback_dir),
            Self::ResourcesCatalog => path_string(&config.resources.catalog),
            Self::ResourcesSettingsDir => path_string(&config.resources.settings_dir),
            Self::LoggingDirectory => path_string(&config.logging.directory),
            Self::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Parse `value` and store it. An empty value clears optional paths.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::InstallMaxConcurrentInstallations => {
                config.install.max_concurrent_installations = self.parse_positive(value)?
            }
            Self::InstallMaxRetryCount => config.install.max_retry_count = self.parse(value)?,
            Self::InstallRetryDelaySecs => config.install.retry_delay_secs = self.parse(value)?,
            Self::InstallTimeoutSecs => {
                config.install.install_timeout_secs = self.parse_positive(value)? as u64
            }
            Self::InstallElevate => config.install.elevate = self.parse_bool(value)?,
            Self::InstallHardCancel => config.install.hard_cancel = self.parse_bool(value)?,
            Self::DownloadMaxConcurrentDownloads => {
                config.download.max_concurrent_downloads = self.parse_positive(value)?
            }
            Self::DownloadTimeoutSecs => {
                config.download.timeout_secs = self.parse_positive(value)? as u64
            }
            Self::DownloadStagingDir => config.download.staging_dir = optional_path(value),
            Self::DownloadMinPayloadBytes => {
                config.download.min_payload_bytes = self.parse(value)?
            }
            Self::DownloadSizeTolerance => {
                let tolerance: f64 = self.parse(value)?;
                if !(0.0..=1.0).contains(&tolerance) {
                    return Err(self.invalid(value, "must be between 0.0 and 1.0"));
                }
                config.download.size_tolerance = tolerance;
            }
            Self::ResourcesFallbackDir => config.resources.fallback_dir = optional_path(value),
            Self::ResourcesCatalog => config.resources.catalog = optional_path(value),
            Self::ResourcesSettingsDir => config.resources.settings_dir = optional_path(value),
            Self::LoggingDirectory => config.logging.directory = optional_path(value),
            Self::LoggingLevel => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.logging.level = value.to_string();
            }
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn parse_positive(&self, value: &str) -> Result<usize, ConfigError> {
        match self.parse::<usize>(value)? {
            0 => Err(self.invalid(value, "must be at least 1")),
            n => Ok(n),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
