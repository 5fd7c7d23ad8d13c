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

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Args;
use fls_common::time::OffsetClock;
use fls_sntp::SntpClient;
use tokio::runtime::Runtime;

use crate::{init_logging, load_config};

#[derive(Debug, Args)]
pub struct TimeCommand {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Query these hosts, in order, instead of the configured list.
    #[arg(long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    #[arg(long)]
    port: Option<u16>,
}

pub fn run(command: TimeCommand) -> Result<()> {
    // Without an explicit --config, fall back to built-in servers.
    let config = match command.config.as_deref() {
        Some(path) => Some(load_config(Some(path))?),
        None => load_config(None).ok(),
    };
    init_logging(config.as_ref())?;
    let time_config = config.map(|config| config.time).unwrap_or_default();
    let mut client = SntpClient::from_config(&time_config);
    if !command.hosts.is_empty() {
        client = SntpClient::new(command.hosts)
            .with_port(time_config.port)
            .with_attempt_timeout(time_config.attempt_timeout);
    }
    if let Some(port) = command.port {
        client = client.with_port(port);
    }

    let runtime = Runtime::new()?;
    let trusted = runtime
        .block_on(client.get_date())
        .ok_or_else(|| anyhow!("no time server in {:?} answered", client.hosts()))?;
    let clock = OffsetClock::from_trusted(trusted);
    println!("Trusted: {}", trusted.to_rfc3339());
    println!("Local: {}", Utc::now().to_rfc3339());
    println!("Offset: {} ms", clock.offset().num_milliseconds());
    Ok(())
}
