//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LicenseResult;
use crate::keys::RsaPrivateKey;
use crate::kind::LicenseKind;
use crate::tool::{sign_floating_license, sign_license, LicenseAttributes};

/// Issues licenses for one product, bound to that product's private key.
#[derive(Debug)]
pub struct LicenseGenerator {
    private_key: RsaPrivateKey,
}

impl LicenseGenerator {
    /// Parse the product's `<RSAKeyValue>` private key.
    pub fn new(private_key: &str) -> LicenseResult<Self> {
        Ok(Self {
            private_key: RsaPrivateKey::from_xml(private_key)?,
        })
    }

    /// Issue a signed license; `attributes` defaults to an empty set.
    pub fn generate(
        &self,
        name: &str,
        id: Uuid,
        expiration: DateTime<Utc>,
        attributes: Option<&LicenseAttributes>,
        kind: LicenseKind,
    ) -> LicenseResult<String> {
        let empty = LicenseAttributes::new();
        sign_license(
            &self.private_key,
            name,
            id,
            expiration,
            attributes.unwrap_or(&empty),
            kind,
        )
    }

    /// Issue a floating license pointing clients at the lease server owning
    /// `public_key`.
    pub fn generate_floating_license(&self, name: &str, public_key: &str) -> LicenseResult<String> {
        sign_floating_license(&self.private_key, name, public_key)
    }
}
