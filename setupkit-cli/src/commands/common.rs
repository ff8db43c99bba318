//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use setupkit::catalog::{Catalog, Category, TaskDescriptor};
use setupkit::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Product category selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CategoryArg {
    Browser,
    Archiver,
    Media,
    Communication,
    Security,
    Driver,
    Development,
    Utility,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Browser => Category::Browser,
            CategoryArg::Archiver => Category::Archiver,
            CategoryArg::Media => Category::Media,
            CategoryArg::Communication => Category::Communication,
            CategoryArg::Security => Category::Security,
            CategoryArg::Driver => Category::Driver,
            CategoryArg::Development => Category::Development,
            CategoryArg::Utility => Category::Utility,
        }
    }
}

/// `--config` when given, else the default location.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the config file, or defaults when it does not exist yet.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(cli_path);
    if path.exists() {
        Ok(ConfigFile::load_from(&path)?)
    } else {
        Ok(ConfigFile::default())
    }
}

/// Products named on the command line, or the whole catalog with `--all`.
pub fn select_products(
    catalog: &Catalog,
    names: &[String],
    all: bool,
) -> Result<Vec<Arc<TaskDescriptor>>, CliError> {
    match (all, names.is_empty()) {
        (true, true) => Ok(catalog.select_all()),
        (true, false) => Err(CliError::Config(
            "Use either product names or --all, not both".to_string(),
        )),
        (false, true) => Err(CliError::Config(
            "No products given. Name products to install or use --all. \
             Use 'setupkit list' to see the catalog."
                .to_string(),
        )),
        (false, false) => Ok(catalog.select(names)?),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
