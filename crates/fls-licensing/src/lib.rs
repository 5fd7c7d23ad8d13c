//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! FLS licensing crate: RSA key material, enveloped XML signatures, license
//! document issuance, and license file validation with telemetry.

pub mod error;
pub mod generator;
pub mod keys;
pub mod kind;
pub mod logging;
pub mod signature;
pub mod tool;
pub mod validator;
pub mod xml;

pub use error::{LicenseError, LicenseResult};
pub use generator::LicenseGenerator;
pub use keys::{RsaPrivateKey, RsaPublicKey};
pub use kind::LicenseKind;
pub use tool::{
    format_expiration, generate_floating_license, generate_license, parse_expiration,
    LicenseAttributes,
};
pub use validator::{LicenseDetails, LicenseValidator};
