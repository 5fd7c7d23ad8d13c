//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Builds and signs license documents.
//!
//! Everything here is a pure function of its inputs: no I/O, no shared state.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::{LicenseError, LicenseResult};
use crate::keys::RsaPrivateKey;
use crate::kind::LicenseKind;
use crate::signature::sign_enveloped;
use crate::xml::XmlElement;

/// Extra attributes carried on a `<license>` element, in emission order.
pub type LicenseAttributes = IndexMap<String, String>;

/// Root element of a standard (non-floating) license.
pub const LICENSE_ELEMENT: &str = "license";
/// Root element of a floating license handed to clients of a lease server.
pub const FLOATING_LICENSE_ELEMENT: &str = "floating-license";
/// Child of `floating-license` holding the lease server's public key.
pub const FLOATING_PUBLIC_KEY_ELEMENT: &str = "license-license-public-key";
/// Child element holding the license holder's name.
pub const NAME_ELEMENT: &str = "name";
/// Attributes with fixed meaning on `<license>`.
pub const RESERVED_ATTRIBUTES: [&str; 3] = ["id", "expiration", "kind"];

const EXPIRATION_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format an expiration instant as `yyyy-MM-ddTHH:mm:ss.fffffff`.
///
/// Seven fractional digits (100 ns ticks) and no zone designator.
pub fn format_expiration(expiration: DateTime<Utc>) -> String {
    format!(
        "{}.{:07}",
        expiration.format(EXPIRATION_SECONDS_FORMAT),
        expiration.timestamp_subsec_nanos() / 100
    )
}

/// Parse an expiration produced by [`format_expiration`].
///
/// Any number of fractional digits (including none) is accepted; the value is
/// always interpreted as UTC.
pub fn parse_expiration(raw: &str) -> LicenseResult<DateTime<Utc>> {
    let raw = raw.trim().trim_end_matches('Z');
    let (seconds, fraction) = match raw.split_once('.') {
        Some((seconds, fraction)) => (seconds, fraction),
        None => (raw, ""),
    };
    let base = NaiveDateTime::parse_from_str(seconds, EXPIRATION_SECONDS_FORMAT)
        .map_err(|err| LicenseError::Malformed(format!("invalid expiration '{raw}': {err}")))?;
    if !fraction.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(LicenseError::Malformed(format!(
            "invalid expiration fraction '{fraction}'"
        )));
    }
    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    let nanos: u32 = digits
        .parse()
        .map_err(|_| LicenseError::Malformed(format!("invalid expiration fraction '{fraction}'")))?;
    let with_nanos = base
        .with_nanosecond(nanos)
        .ok_or_else(|| LicenseError::Malformed(format!("invalid expiration '{raw}'")))?;
    Ok(with_nanos.and_utc())
}

/// Build and sign a standard license document with a parsed key.
pub fn sign_license(
    key: &RsaPrivateKey,
    name: &str,
    id: Uuid,
    expiration: DateTime<Utc>,
    attributes: &LicenseAttributes,
    kind: LicenseKind,
) -> LicenseResult<String> {
    let mut license = XmlElement::new(LICENSE_ELEMENT)
        .with_attribute("id", id.to_string())
        .with_attribute("expiration", format_expiration(expiration))
        .with_attribute("kind", kind.to_string());
    for (key_name, value) in attributes {
        if RESERVED_ATTRIBUTES.contains(&key_name.as_str()) {
            return Err(LicenseError::Malformed(format!(
                "attribute '{key_name}' is reserved"
            )));
        }
        if !is_attribute_name(key_name) {
            return Err(LicenseError::Malformed(format!(
                "attribute '{key_name}' is not a valid XML name"
            )));
        }
        license.set_attribute(key_name.as_str(), value.as_str());
    }
    license.push_child(XmlElement::new(NAME_ELEMENT).with_text(name));
    sign_enveloped(&mut license, key)?;
    license.to_pretty_string()
}

/// Unprefixed XML name that is not a namespace declaration.
fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xmlns")
}

/// Build and sign a floating license document with a parsed key.
pub fn sign_floating_license(
    key: &RsaPrivateKey,
    name: &str,
    public_key_xml: &str,
) -> LicenseResult<String> {
    let mut license = XmlElement::new(FLOATING_LICENSE_ELEMENT)
        .with_child(XmlElement::new(FLOATING_PUBLIC_KEY_ELEMENT).with_text(public_key_xml.trim()))
        .with_child(XmlElement::new(NAME_ELEMENT).with_text(name));
    sign_enveloped(&mut license, key)?;
    license.to_pretty_string()
}

/// Build a standard license and sign it with the key in `private_key_xml`.
///
/// An unparsable key surfaces as [`LicenseError::InvalidKey`].
pub fn generate_license(
    private_key_xml: &str,
    name: &str,
    id: Uuid,
    expiration: DateTime<Utc>,
    attributes: &LicenseAttributes,
    kind: LicenseKind,
) -> LicenseResult<String> {
    let key = RsaPrivateKey::from_xml(private_key_xml)?;
    sign_license(&key, name, id, expiration, attributes, kind)
}

/// Build a floating license carrying `public_key_xml` and sign it with the key
/// in `private_key_xml`.
pub fn generate_floating_license(
    private_key_xml: &str,
    name: &str,
    public_key_xml: &str,
) -> LicenseResult<String> {
    let key = RsaPrivateKey::from_xml(private_key_xml)?;
    sign_floating_license(&key, name, public_key_xml)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const PRIVATE: &str = include_str!("../../../configs/keys/software.private.xml");
    const SERVER_PUBLIC: &str = include_str!("../../../configs/keys/server.public.xml");

    #[test]
    fn expiration_uses_seven_fraction_digits() {
        let instant = Utc.with_ymd_and_hms(2031, 2, 3, 4, 5, 6).unwrap()
            + chrono::Duration::nanoseconds(123_456_700);
        let raw = format_expiration(instant);
        assert_eq!(raw, "2031-02-03T04:05:06.1234567");
        assert_eq!(parse_expiration(&raw).unwrap(), instant);
    }

    #[test]
    fn expiration_parser_accepts_short_forms() {
        let whole = parse_expiration("2030-01-01T00:00:00").unwrap();
        assert_eq!(whole, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        let millis = parse_expiration("2030-01-01T00:00:00.5").unwrap();
        assert_eq!(millis.timestamp_subsec_millis(), 500);
        assert!(parse_expiration("yesterday").is_err());
        assert!(parse_expiration("2030-01-01T00:00:00.5x").is_err());
    }

    #[test]
    fn license_document_layout() {
        let id = Uuid::new_v4();
        let mut attributes = LicenseAttributes::new();
        attributes.insert("seats".to_owned(), "5".to_owned());
        attributes.insert("edition".to_owned(), "pro".to_owned());
        let raw = generate_license(
            PRIVATE,
            "Alice",
            id,
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            &attributes,
            LicenseKind::Standard,
        )
        .unwrap();

        let doc = XmlElement::parse(&raw).unwrap();
        assert_eq!(doc.name, "license");
        let names: Vec<&str> = doc.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["id", "expiration", "kind", "seats", "edition"]);
        assert_eq!(doc.attribute("id"), Some(id.to_string().as_str()));
        assert_eq!(doc.attribute("expiration"), Some("2030-01-01T00:00:00.0000000"));
        assert_eq!(doc.attribute("kind"), Some("Standard"));
        assert_eq!(doc.child("name").unwrap().text(), "Alice");
        assert_eq!(doc.elements().last().unwrap().name, "Signature");
    }

    #[test]
    fn reserved_attribute_names_are_refused() {
        let mut attributes = LicenseAttributes::new();
        attributes.insert("kind".to_owned(), "Trial".to_owned());
        let err = generate_license(
            PRIVATE,
            "Alice",
            Uuid::new_v4(),
            Utc::now(),
            &attributes,
            LicenseKind::Standard,
        )
        .unwrap_err();
        assert!(matches!(err, LicenseError::Malformed(_)));
    }

    #[test]
    fn attribute_keys_must_be_xml_names() {
        for bad in ["bad name", "1st", "", "a:b", "xmlns", "xmlns:evil", "a=b", "q\"x"] {
            let mut attributes = LicenseAttributes::new();
            attributes.insert(bad.to_owned(), "x".to_owned());
            let err = generate_license(
                PRIVATE,
                "Alice",
                Uuid::new_v4(),
                Utc::now(),
                &attributes,
                LicenseKind::Standard,
            )
            .unwrap_err();
            assert!(matches!(err, LicenseError::Malformed(_)), "{bad:?} accepted");
        }

        let mut attributes = LicenseAttributes::new();
        for good in ["seat-count", "_internal.tag", "édition", "v2"] {
            attributes.insert(good.to_owned(), "x".to_owned());
        }
        let raw = generate_license(
            PRIVATE,
            "Alice",
            Uuid::new_v4(),
            Utc::now(),
            &attributes,
            LicenseKind::Standard,
        )
        .unwrap();
        let doc = XmlElement::parse(&raw).unwrap();
        assert_eq!(doc.attribute("édition"), Some("x"));
        assert_eq!(doc.attribute("_internal.tag"), Some("x"));
    }

    #[test]
    fn floating_license_embeds_server_public_key() {
        let raw = generate_floating_license(PRIVATE, "Acme", SERVER_PUBLIC).unwrap();
        let doc = XmlElement::parse(&raw).unwrap();
        assert_eq!(doc.name, "floating-license");
        let key = doc.child(FLOATING_PUBLIC_KEY_ELEMENT).unwrap().text();
        assert_eq!(key, SERVER_PUBLIC.trim());
        assert_eq!(doc.child("name").unwrap().text(), "Acme");
    }

    #[test]
    fn invalid_private_key_is_a_key_error() {
        let err = generate_floating_license("<RSAKeyValue/>", "Acme", SERVER_PUBLIC).unwrap_err();
        assert!(matches!(err, LicenseError::InvalidKey(_)));
    }
}
