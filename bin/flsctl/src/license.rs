//! ---
//! fls_section: "07-administration"
//! fls_subsection: "binary"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Control CLI for administrators of a license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use fls_licensing::{LicenseAttributes, LicenseGenerator, LicenseKind, LicenseValidator};
use uuid::Uuid;

use crate::init_logging;

#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Sign a standard license for one holder.
    Generate(GenerateArgs),
    /// Sign a floating license that points clients at a lease server.
    Floating(FloatingArgs),
    /// Check a license file's signature and print its contents.
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Product private key (`<RSAKeyValue>` XML).
    #[arg(long = "private-key", value_name = "FILE")]
    private_key: PathBuf,

    /// License holder name.
    #[arg(long)]
    name: String,

    /// Holder identity; a random one is generated when omitted.
    #[arg(long)]
    id: Option<Uuid>,

    /// Absolute expiration (RFC 3339).
    #[arg(long, value_name = "RFC3339", conflicts_with = "days", required_unless_present = "days")]
    expires: Option<DateTime<Utc>>,

    /// Expiration relative to now, in days.
    #[arg(long, value_name = "N")]
    days: Option<i64>,

    #[arg(long, default_value = "Standard")]
    kind: LicenseKind,

    /// Extra attribute, repeatable.
    #[arg(long = "attribute", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    attributes: Vec<(String, String)>,

    /// Write here instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FloatingArgs {
    #[arg(long = "private-key", value_name = "FILE")]
    private_key: PathBuf,

    /// Lease server public key embedded in the document.
    #[arg(long = "public-key", value_name = "FILE")]
    public_key: PathBuf,

    #[arg(long)]
    name: String,

    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(long = "public-key", value_name = "FILE")]
    public_key: PathBuf,

    #[arg(long, value_name = "FILE")]
    license: PathBuf,
}

pub fn run(command: LicenseCommand) -> Result<()> {
    init_logging(None)?;
    match command {
        LicenseCommand::Generate(args) => generate(args),
        LicenseCommand::Floating(args) => floating(args),
        LicenseCommand::Verify(args) => verify(args),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let generator = LicenseGenerator::new(&read_key(&args.private_key)?)
        .context("private key is not a valid RSAKeyValue document")?;
    let expiration = match (args.expires, args.days) {
        (Some(expires), _) => expires,
        (None, Some(days)) => Utc::now() + Duration::days(days),
        (None, None) => return Err(anyhow!("either --expires or --days is required")),
    };
    let attributes: LicenseAttributes = args.attributes.into_iter().collect();
    let id = args.id.unwrap_or_else(Uuid::new_v4);
    let document = generator.generate(&args.name, id, expiration, Some(&attributes), args.kind)?;
    emit(&document, args.output.as_deref())
}

fn floating(args: FloatingArgs) -> Result<()> {
    let generator = LicenseGenerator::new(&read_key(&args.private_key)?)
        .context("private key is not a valid RSAKeyValue document")?;
    let document =
        generator.generate_floating_license(&args.name, &read_key(&args.public_key)?)?;
    emit(&document, args.output.as_deref())
}

fn verify(args: VerifyArgs) -> Result<()> {
    let mut validator = LicenseValidator::new(read_key(&args.public_key)?, &args.license);
    validator
        .assert_valid_license()
        .with_context(|| format!("{} is not a valid license", args.license.display()))?;
    println!("Name: {}", validator.name());
    println!("Id: {}", validator.user_id());
    println!("Kind: {}", validator.license_kind());
    println!("Expires: {}", validator.expiration().to_rfc3339());
    for (key, value) in validator.license_attributes() {
        println!("{key}: {value}");
    }
    Ok(())
}

fn read_key(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("unable to read key file {}", path.display()))
}

fn emit(document: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, document)
                .with_context(|| format!("unable to write {}", path.display()))?;
            println!("License written to {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("attribute key is empty in '{raw}'"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}
