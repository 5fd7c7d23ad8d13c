//! ---
//! fls_section: "07-administration"
//! fls_subsection: "binary"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Control CLI for administrators of a license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use fls_common::config::AppConfig;
use fls_logging as logging;

mod lease;
mod license;
mod time;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Floating license server administrative utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Issue and verify signed license files")]
    License(license::LicenseCommand),
    #[command(subcommand, about = "Lease floating licenses from a local license directory")]
    Lease(lease::LeaseCommand),
    #[command(about = "Query trusted time servers")]
    Time(time::TimeCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::License(cmd) => license::run(cmd)?,
        Commands::Lease(cmd) => lease::run(cmd)?,
        Commands::Time(cmd) => time::run(cmd)?,
    }
    Ok(())
}

/// Explicit `--config` first, then the conventional locations.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from("configs/fls.toml"));
    candidates.push(PathBuf::from("/etc/fls/fls.toml"));
    AppConfig::load(&candidates)
}

/// Config-driven logging once a config is known; stderr-only otherwise.
pub(crate) fn init_logging(config: Option<&AppConfig>) -> Result<()> {
    match config {
        Some(config) => fls_common::init_tracing("flsctl", &config.logging),
        None => {
            logging::init();
            Ok(())
        }
    }
}
