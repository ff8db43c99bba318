//! Init command - write the configuration file.

use std::path::Path;

use crate::commands::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Run the init command.
///
/// Existing values are kept; anything missing is filled with defaults.
pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    let existed = path.exists();

    let config = load_config(config_path)?;
    config.save_to(&path)?;

    if existed {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Edit this file or use 'setupkit config set' to customize SetupKit.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
