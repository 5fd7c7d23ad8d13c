//! ---
//! fls_section: "07-administration"
//! fls_subsection: "binary"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Control CLI for administrators of a license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fls_lease::{LeaseManager, LeaseManagerConfig};
use uuid::Uuid;

use crate::{init_logging, load_config};

#[derive(Debug, Subcommand)]
pub enum LeaseCommand {
    /// Lease (or renew) a floating license for one client.
    Request(RequestArgs),
    /// Show free licenses and current leases.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    machine: String,

    #[arg(long)]
    user: String,

    /// Client instance id; random when omitted.
    #[arg(long)]
    id: Option<Uuid>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the snapshot as JSON.
    #[arg(long)]
    json: bool,
}

pub fn run(command: LeaseCommand) -> Result<()> {
    match command {
        LeaseCommand::Request(args) => request(args),
        LeaseCommand::Status(args) => status(args),
    }
}

fn open_manager(config: Option<&std::path::Path>) -> Result<LeaseManager> {
    let config = load_config(config)?;
    init_logging(Some(&config))?;
    let manager_config = LeaseManagerConfig::from_licensing_config(&config.licensing)?;
    LeaseManager::open(manager_config).context("unable to start lease manager")
}

fn request(args: RequestArgs) -> Result<()> {
    let mut manager = open_manager(args.config.as_deref())?;
    let id = args.id.unwrap_or_else(Uuid::new_v4);
    match manager.lease_license(&args.machine, &args.user, id)? {
        Some(license) => println!("{license}"),
        None => println!("No license available"),
    }
    Ok(())
}

fn status(args: StatusArgs) -> Result<()> {
    let manager = open_manager(args.config.as_deref())?;
    let snapshot = manager.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    println!("Available: {}", snapshot.available);
    println!("Leases: {}", snapshot.leases.len());
    for lease in &snapshot.leases {
        println!(
            "  {} -> {} ({}) renewed_at={}",
            lease.identifier,
            lease.name,
            lease.user_id,
            lease.renewed_at.to_rfc3339()
        );
    }
    Ok(())
}
