//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while building, signing, or validating license documents.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// RSA key material could not be parsed or was rejected by the crypto backend.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The signing backend failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// XML could not be read or written.
    #[error("xml error: {0}")]
    Xml(String),

    /// The document parsed as XML but does not have the expected license shape.
    #[error("malformed license document: {0}")]
    Malformed(String),

    /// No enveloped signature was found on the document.
    #[error("license signature missing")]
    MissingSignature,

    /// Digest or signature verification failed.
    #[error("license signature invalid")]
    InvalidSignature,

    /// License expiration lies in the past relative to the validation instant.
    #[error("license expired at {0}")]
    Expired(DateTime<Utc>),

    /// A floating license was presented to a validator that refuses them.
    #[error("floating licenses are disabled for this validator")]
    FloatingDisabled,

    /// A floating license must be exchanged for a lease before use.
    #[error("floating license requires a lease from a license server")]
    FloatingLeaseRequired,

    /// The license file could not be read.
    #[error("unable to read license file {path}: {source}")]
    Read {
        /// Path of the license file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for licensing operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
