//! Default locations under `~/.setupkit`.

use std::path::PathBuf;

/// Name of the per-user directory in the home directory.
const APP_DIR: &str = ".setupkit";

const CONFIG_FILE: &str = "config.ini";

/// `~/.setupkit`, or a directory under the system temp dir when there is
/// no home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// `~/.setupkit/config.ini`
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Payload staging directory used when none is configured.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("setupkit-staging")
}

/// Where product settings files go when none is configured.
pub fn default_settings_dir() -> PathBuf {
    config_dir().join("products")
}

pub fn default_log_dir() -> PathBuf {
    config_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_config_dir() {
        let base = config_dir();
        assert!(base.ends_with(APP_DIR));
        assert_eq!(config_file_path(), base.join("config.ini"));
        assert!(default_settings_dir().starts_with(&base));
        assert!(default_log_dir().starts_with(&base));
    }
}
