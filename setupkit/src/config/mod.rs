//! User configuration.
//!
//! Settings live in `~/.setupkit/config.ini`:
//!
//! ```ini
//! [install]
//! max_concurrent_installations = 3
//! max_retry_count = 2
//! retry_delay_secs = 2
//! install_timeout_secs = 600
//! elevate = true
//! hard_cancel = false
//!
//! [download]
//! max_concurrent_downloads = 4
//! timeout_secs = 300
//! staging_dir =
//! min_payload_bytes = 1024
//! size_tolerance = 0.1
//!
//! [resources]
//! fallback_dir =
//! catalog =
//! settings_dir =
//!
//! [logging]
//! directory =
//! level = info
//! ```
//!
//! Every key can be read and written individually through [`ConfigKey`].

mod file;
mod keys;
mod paths;

pub use file::{
    ConfigError, ConfigFile, DownloadSettings, InstallSettings, LoggingSettings, ResourceSettings,
};
pub use keys::ConfigKey;
pub use paths::{
    config_dir, config_file_path, default_log_dir, default_settings_dir, default_staging_dir,
};
