//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::path::PathBuf;

use fls_licensing::LicenseError;
use fls_persistence::PersistenceError;

/// Result alias for lease operations.
pub type LeaseResult<T> = std::result::Result<T, LeaseError>;

/// Failures surfaced by the lease manager and service.
#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
    /// A required key was absent or blank.
    #[error("missing required configuration: {0}")]
    MissingConfiguration(&'static str),
    /// The `Licenses` directory could not be created or listed.
    #[error("license directory {path} is unusable: {source}")]
    LicenseDirectory {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The lease-state file could not be opened or read at startup.
    #[error("lease state could not be restored: {0}")]
    StateFile(#[source] PersistenceError),
    /// The lease table could not be written after a lease.
    #[error("lease state could not be persisted: {0}")]
    Persist(#[source] PersistenceError),
    /// Key parsing or license minting failed.
    #[error(transparent)]
    License(#[from] LicenseError),
    /// The lease service owner thread is gone.
    #[error("lease service has stopped")]
    ServiceStopped,
}
