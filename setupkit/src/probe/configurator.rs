//! Post-install settings storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::SystemConfigurator;

/// Failure to store product settings.
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("failed to read settings file {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write settings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

/// Writes each product's settings to `<settings_dir>/<product>.ini`.
///
/// Existing files are merged: keys in other sections, or not named in the
/// current call, are left untouched.
#[derive(Debug, Clone)]
pub struct IniConfigurator {
    settings_dir: PathBuf,
}

impl IniConfigurator {
    pub fn new(settings_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings_dir: settings_dir.into(),
        }
    }

    /// Settings file used for `product`.
    pub fn settings_path(&self, product: &str) -> PathBuf {
        self.settings_dir.join(format!("{}.ini", file_stem(product)))
    }

    fn load(path: &Path) -> Result<Ini, ConfigureError> {
        if !path.exists() {
            return Ok(Ini::new());
        }
        Ini::load_from_file(path).map_err(|e| ConfigureError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl SystemConfigurator for IniConfigurator {
    fn apply(
        &self,
        product: &str,
        section: &str,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), ConfigureError> {
        let path = self.settings_path(product);
        let mut ini = Self::load(&path)?;

        for (key, value) in settings {
            ini.with_section(Some(section)).set(key.as_str(), value.as_str());
        }

        std::fs::create_dir_all(&self.settings_dir).map_err(|source| ConfigureError::Write {
            path: self.settings_dir.clone(),
            source,
        })?;
        ini.write_to_file(&path)
            .map_err(|source| ConfigureError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(product, section, keys = settings.len(), path = %path.display(), "settings applied");
        Ok(())
    }
}

/// Lowercase product name with anything outside `[a-z0-9]` collapsed to `-`.
fn file_stem(product: &str) -> String {
    let mut stem = String::with_capacity(product.len());
    for c in product.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "product".to_string()
    } else {
        stem.to_string()
    }
}
