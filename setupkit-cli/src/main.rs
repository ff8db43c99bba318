//! SetupKit CLI - Command-line interface
//!
//! Installs a curated catalog of products unattended, using the
//! `setupkit` library for downloading, verification and orchestration.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::common::CategoryArg;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::install::InstallArgs;
use commands::list::ListArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "setupkit")]
#[command(about = "Unattended installer for a curated catalog of software products", long_about = None)]
#[command(version)]
struct Cli {
    /// Use this configuration file instead of ~/.setupkit/config.ini
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also log to stderr at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the products in the catalog
    List {
        /// Catalog file (JSON); defaults to the configured or built-in catalog
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Only show products in this category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Download, verify and install products
    Install {
        /// Product names to install
        names: Vec<String>,

        /// Install every product in the catalog
        #[arg(long)]
        all: bool,

        /// Catalog file (JSON); defaults to the configured or built-in catalog
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Maximum number of concurrent installations
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Retry rounds for failed products
        #[arg(long)]
        retries: Option<u32>,

        /// Installer timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Download and verify payloads without installing them
    Fetch {
        /// Product names to fetch
        names: Vec<String>,

        /// Fetch every product in the catalog
        #[arg(long)]
        all: bool,

        /// Catalog file (JSON); defaults to the configured or built-in catalog
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Destination directory (default: current directory)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Number of parallel downloads
        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Create or refresh the configuration file with every known key
    Init,

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config_path),
        Commands::Config { command } => commands::config::run(command, config_path),
        Commands::List { catalog, category } => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            commands::list::run(&runner, ListArgs { catalog, category })
        }
        Commands::Install {
            names,
            all,
            catalog,
            max_concurrent,
            retries,
            timeout,
            yes,
        } => commands::install::run(
            CliRunner::new(config_path, cli.verbose)?,
            InstallArgs {
                names,
                all,
                catalog,
                max_concurrent,
                retries,
                timeout,
                yes,
            },
        ),
        Commands::Fetch {
            names,
            all,
            catalog,
            dest,
            parallel,
        } => commands::fetch::run(
            CliRunner::new(config_path, cli.verbose)?,
            FetchArgs {
                names,
                all,
                catalog,
                dest,
                parallel,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::parse_from([
            "setupkit",
            "--config",
            "/tmp/custom.ini",
            "install",
            "7-Zip",
            "Git",
            "--max-concurrent",
            "2",
            "-y",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/custom.ini")));
        match cli.command {
            Commands::Install {
                names,
                max_concurrent,
                yes,
                all,
                ..
            } => {
                assert_eq!(names, vec!["7-Zip", "Git"]);
                assert_eq!(max_concurrent, Some(2));
                assert!(yes);
                assert!(!all);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["setupkit", "list", "--category", "development", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::List {
                category: Some(CategoryArg::Development),
                ..
            }
        ));
    }
}
