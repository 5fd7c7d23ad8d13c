//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::Result;
use fls_common::config::LicensingConfig;

use crate::error::{LeaseError, LeaseResult};

/// Directory under the base directory scanned for license files.
pub const LICENSES_DIRECTORY: &str = "Licenses";

/// Immutable inputs of a [`crate::LeaseManager`].
#[derive(Clone)]
pub struct LeaseManagerConfig {
    /// `<RSAKeyValue>` public key that license files are verified against.
    pub software_public_key: String,
    /// `<RSAKeyValue>` private key used to sign leased floating licenses.
    pub license_server_private_key: String,
    /// Holds `Licenses/` and the lease-state file.
    pub base_directory: PathBuf,
}

impl LeaseManagerConfig {
    pub fn new(
        software_public_key: impl Into<String>,
        license_server_private_key: impl Into<String>,
        base_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            software_public_key: software_public_key.into(),
            license_server_private_key: license_server_private_key.into(),
            base_directory: base_directory.into(),
        }
    }

    /// Resolve key material from the `[licensing]` section.
    ///
    /// Absent keys become empty strings and are rejected by
    /// [`LeaseManagerConfig::validate`].
    pub fn from_licensing_config(config: &LicensingConfig) -> Result<Self> {
        Ok(Self::new(
            config.load_software_public_key()?.unwrap_or_default(),
            config.load_server_private_key()?.unwrap_or_default(),
            config.base_directory.clone(),
        ))
    }

    /// Both keys must be present and non-blank.
    pub fn validate(&self) -> LeaseResult<()> {
        if self.software_public_key.trim().is_empty() {
            return Err(LeaseError::MissingConfiguration("software public key"));
        }
        if self.license_server_private_key.trim().is_empty() {
            return Err(LeaseError::MissingConfiguration(
                "license server private key",
            ));
        }
        Ok(())
    }

    pub fn licenses_directory(&self) -> PathBuf {
        self.base_directory.join(LICENSES_DIRECTORY)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }
}

// Key material stays out of debug output.
impl std::fmt::Debug for LeaseManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseManagerConfig")
            .field("base_directory", &self.base_directory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_missing_configuration() {
        let config = LeaseManagerConfig::new("  ", "<RSAKeyValue/>", ".");
        assert!(matches!(
            config.validate(),
            Err(LeaseError::MissingConfiguration("software public key"))
        ));
        let config = LeaseManagerConfig::new("<RSAKeyValue/>", "", ".");
        assert!(matches!(
            config.validate(),
            Err(LeaseError::MissingConfiguration("license server private key"))
        ));
    }

    #[test]
    fn debug_output_hides_keys() {
        let config = LeaseManagerConfig::new("PUBLIC-SECRET", "PRIVATE-SECRET", "/srv/fls");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("/srv/fls"));
    }

    #[test]
    fn licenses_directory_is_under_base() {
        let config = LeaseManagerConfig::new("a", "b", "/srv/fls");
        assert_eq!(
            config.licenses_directory(),
            PathBuf::from("/srv/fls/Licenses")
        );
    }
}
