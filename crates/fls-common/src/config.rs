//! ---
//! fls_section: "01-core-functionality"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Shared primitives and utilities for the license server."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_base_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_ntp_hosts() -> Vec<String> {
    vec![
        "time.windows.com".to_owned(),
        "pool.ntp.org".to_owned(),
        "time.nist.gov".to_owned(),
    ]
}

fn default_ntp_port() -> u16 {
    123
}

fn default_attempt_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Primary configuration object for the license server and its tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub licensing: LicensingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub time: TimeConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "FLS_CONFIG";

    /// Load configuration from disk, respecting the `FLS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.licensing.base_directory.as_os_str().is_empty() {
            return Err(anyhow!("licensing.base_directory must not be empty"));
        }
        self.time.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where to find one piece of key material.
///
/// The file wins when it exists; otherwise the environment variable is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Overrides the section's default variable name.
    #[serde(default)]
    pub env_var: Option<String>,
}

impl KeyConfig {
    /// Resolve the key blob, falling back to `default_env_var` when no
    /// override is configured. Blank values count as absent.
    pub fn load(&self, default_env_var: &str) -> Result<Option<String>> {
        if let Some(path) = self.path.as_ref().filter(|path| path.is_file()) {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("unable to read key file {}", path.display()))?;
            return Ok(non_blank(raw));
        }
        let var = self.env_var.as_deref().unwrap_or(default_env_var);
        Ok(std::env::var(var).ok().and_then(non_blank))
    }
}

fn non_blank(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Lease server key material and working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicensingConfig {
    /// Holds the `Licenses` directory and the lease-state file.
    #[serde(default = "default_base_directory")]
    pub base_directory: PathBuf,
    /// Public key that license files must be signed against.
    #[serde(default)]
    pub software_public_key: KeyConfig,
    /// Private key used to sign leased floating licenses.
    #[serde(default)]
    pub server_private_key: KeyConfig,
}

impl LicensingConfig {
    pub const ENV_SOFTWARE_PUBLIC_KEY: &'static str = "FLS_SOFTWARE_PUBLIC_KEY";
    pub const ENV_SERVER_PRIVATE_KEY: &'static str = "FLS_SERVER_PRIVATE_KEY";

    pub fn load_software_public_key(&self) -> Result<Option<String>> {
        self.software_public_key.load(Self::ENV_SOFTWARE_PUBLIC_KEY)
    }

    pub fn load_server_private_key(&self) -> Result<Option<String>> {
        self.server_private_key.load(Self::ENV_SERVER_PRIVATE_KEY)
    }
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            base_directory: default_base_directory(),
            software_public_key: KeyConfig::default(),
            server_private_key: KeyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Trusted time sources, tried in order.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    #[serde(default = "default_ntp_hosts")]
    pub ntp_hosts: Vec<String>,
    #[serde(default = "default_ntp_port")]
    pub port: u16,
    #[serde(rename = "attempt_timeout_ms", default = "default_attempt_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub attempt_timeout: Duration,
}

impl TimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.attempt_timeout.is_zero() {
            return Err(anyhow!("time.attempt_timeout_ms must be greater than zero"));
        }
        if let Some(index) = self.ntp_hosts.iter().position(|host| host.trim().is_empty()) {
            return Err(anyhow!("time.ntp_hosts[{index}] must not be empty"));
        }
        Ok(())
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ntp_hosts: default_ntp_hosts(),
            port: default_ntp_port(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}
