//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{LicenseError, LicenseResult};
use crate::keys::RsaPublicKey;
use crate::kind::LicenseKind;
use crate::logging::{record_invalid_license, record_license_load};
use crate::signature::verify_enveloped;
use crate::tool::{
    parse_expiration, LicenseAttributes, FLOATING_LICENSE_ELEMENT, LICENSE_ELEMENT, NAME_ELEMENT,
    RESERVED_ATTRIBUTES,
};
use crate::xml::XmlElement;

/// Metadata extracted from a verified license document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseDetails {
    /// License holder name from the `<name>` element.
    pub name: String,
    /// Holder identity from the `id` attribute.
    pub user_id: Uuid,
    /// Entitlement kind.
    pub kind: LicenseKind,
    /// Expiration instant.
    pub expiration: DateTime<Utc>,
    /// Every non-reserved attribute, in document order.
    pub attributes: LicenseAttributes,
}

/// Verifies one license file against a product public key.
///
/// Accessors return defaults until [`LicenseValidator::assert_valid_license`]
/// has succeeded.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    public_key: String,
    path: PathBuf,
    /// Reject `<floating-license>` documents outright.
    pub disable_floating_licenses: bool,
    details: LicenseDetails,
}

impl LicenseValidator {
    /// Bind a validator to a public key blob and a license file path.
    pub fn new(public_key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            public_key: public_key.into(),
            path: path.into(),
            disable_floating_licenses: false,
            details: LicenseDetails::default(),
        }
    }

    /// Validate against the current system time.
    pub fn assert_valid_license(&mut self) -> LicenseResult<()> {
        self.assert_valid_license_at(Utc::now())
    }

    /// Read, verify, and parse the license file, treating `now` as the current
    /// instant for expiry checks.
    pub fn assert_valid_license_at(&mut self, now: DateTime<Utc>) -> LicenseResult<()> {
        match self.load(now) {
            Ok(details) => {
                record_license_load(&details);
                self.details = details;
                Ok(())
            }
            Err(err) => {
                record_invalid_license(rejection_reason(&err));
                Err(err)
            }
        }
    }

    fn load(&self, now: DateTime<Utc>) -> LicenseResult<LicenseDetails> {
        debug!(license_path = %self.path.display(), "validating license file");
        let raw = fs::read_to_string(&self.path).map_err(|source| LicenseError::Read {
            path: self.path.clone(),
            source,
        })?;
        let document = XmlElement::parse(&raw)?;
        let key = RsaPublicKey::from_xml(&self.public_key)?;
        verify_enveloped(&document, &key)?;

        if document.name == FLOATING_LICENSE_ELEMENT {
            return Err(if self.disable_floating_licenses {
                LicenseError::FloatingDisabled
            } else {
                LicenseError::FloatingLeaseRequired
            });
        }
        if document.name != LICENSE_ELEMENT {
            return Err(LicenseError::Malformed(format!(
                "unexpected root element <{}>",
                document.name
            )));
        }

        let details = parse_details(&document)?;
        if details.expiration < now {
            return Err(LicenseError::Expired(details.expiration));
        }
        Ok(details)
    }

    /// Path of the license file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// License holder name.
    pub fn name(&self) -> &str {
        &self.details.name
    }

    /// Holder identity.
    pub fn user_id(&self) -> Uuid {
        self.details.user_id
    }

    /// Entitlement kind.
    pub fn license_kind(&self) -> LicenseKind {
        self.details.kind
    }

    /// Expiration instant.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.details.expiration
    }

    /// Non-reserved attributes.
    pub fn license_attributes(&self) -> &LicenseAttributes {
        &self.details.attributes
    }

    /// All extracted metadata.
    pub fn details(&self) -> &LicenseDetails {
        &self.details
    }
}

fn parse_details(document: &XmlElement) -> LicenseResult<LicenseDetails> {
    let required = |name: &str| {
        document
            .attribute(name)
            .ok_or_else(|| LicenseError::Malformed(format!("missing '{name}' attribute")))
    };
    let user_id = Uuid::parse_str(required("id")?)
        .map_err(|err| LicenseError::Malformed(format!("invalid license id: {err}")))?;
    let expiration = parse_expiration(required("expiration")?)?;
    let kind = required("kind")?
        .parse::<LicenseKind>()
        .map_err(|err| LicenseError::Malformed(format!("invalid license kind: {err}")))?;
    let name = document
        .child(NAME_ELEMENT)
        .map(XmlElement::text)
        .ok_or_else(|| LicenseError::Malformed("missing <name> element".to_owned()))?;
    let attributes = document
        .attributes
        .iter()
        .filter(|(key, _)| !RESERVED_ATTRIBUTES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(LicenseDetails {
        name,
        user_id,
        kind,
        expiration,
        attributes,
    })
}

fn rejection_reason(err: &LicenseError) -> &'static str {
    match err {
        LicenseError::Read { .. } => "unreadable",
        LicenseError::InvalidSignature | LicenseError::MissingSignature => "invalid_signature",
        LicenseError::Expired(_) => "expired",
        LicenseError::FloatingDisabled | LicenseError::FloatingLeaseRequired => "floating",
        LicenseError::InvalidKey(_) => "invalid_key",
        _ => "malformed",
    }
}
