//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Floating-license lease manager and service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Floating-license leasing: a bounded pool of signed licenses checked out,
//! renewed, and reclaimed by identifier, with the lease table persisted
//! across restarts.

pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod service;
pub mod table;

pub use config::{LeaseManagerConfig, LICENSES_DIRECTORY};
pub use error::{LeaseError, LeaseResult};
pub use manager::{lease_lifetime, renewal_offset, LeaseManager, LeaseSnapshot, LeaseView};
pub use metrics::{LeaseMetrics, LeaseOutcome};
pub use service::LeaseService;
pub use table::{lease_identifier, LeaseRecord, LeaseTable, LicensePool, ValidatorId};
