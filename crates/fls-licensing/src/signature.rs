//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! Enveloped XML signatures over whole license documents.
//!
//! The `<Signature>` element is appended as the last child of the document
//! root and references the entire document (`URI=""`) through the
//! enveloped-signature transform: the digest covers the canonical form of the
//! document with the signature element removed.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::{LicenseError, LicenseResult};
use crate::keys::{RsaPrivateKey, RsaPublicKey};
use crate::xml::XmlElement;

/// XML-DSig namespace carried by the `<Signature>` element.
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
const RSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const ENVELOPED_TRANSFORM: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const SIGNATURE: &str = "Signature";

/// Sign `document` in place, appending the `<Signature>` element.
pub fn sign_enveloped(document: &mut XmlElement, key: &RsaPrivateKey) -> LicenseResult<()> {
    let digest = document_digest(document);
    let signed_info = signed_info(&digest);
    let signature_value = key.sign_sha256(canonical_signed_info(&signed_info).as_bytes())?;
    let signature = XmlElement::new(SIGNATURE)
        .with_attribute("xmlns", XMLDSIG_NAMESPACE)
        .with_child(signed_info)
        .with_child(
            XmlElement::new("SignatureValue")
                .with_text(general_purpose::STANDARD.encode(signature_value)),
        );
    document.push_child(signature);
    Ok(())
}

/// Verify the enveloped signature carried by `document`.
pub fn verify_enveloped(document: &XmlElement, key: &RsaPublicKey) -> LicenseResult<()> {
    let mut unsigned = document.clone();
    let signature = unsigned
        .take_last_child(SIGNATURE)
        .ok_or(LicenseError::MissingSignature)?;
    let signed_info = signature
        .child("SignedInfo")
        .ok_or_else(|| LicenseError::Malformed("signature lacks SignedInfo".to_owned()))?;
    let reference = signed_info
        .child("Reference")
        .ok_or_else(|| LicenseError::Malformed("signature lacks Reference".to_owned()))?;
    if reference.attribute("URI").unwrap_or_default() != "" {
        return Err(LicenseError::Malformed(
            "only whole-document references are supported".to_owned(),
        ));
    }
    let method = signed_info
        .child("SignatureMethod")
        .and_then(|element| element.attribute("Algorithm"));
    if method != Some(RSA_SHA256_ALGORITHM) {
        return Err(LicenseError::Malformed(format!(
            "unsupported signature method {}",
            method.unwrap_or("<none>")
        )));
    }

    let claimed_digest = reference
        .child("DigestValue")
        .map(XmlElement::text)
        .ok_or_else(|| LicenseError::Malformed("reference lacks DigestValue".to_owned()))?;
    if claimed_digest != document_digest(&unsigned) {
        return Err(LicenseError::InvalidSignature);
    }

    let signature_value = signature
        .child("SignatureValue")
        .map(XmlElement::text)
        .ok_or_else(|| LicenseError::Malformed("signature lacks SignatureValue".to_owned()))?;
    let signature_bytes = general_purpose::STANDARD
        .decode(signature_value)
        .map_err(|_| LicenseError::InvalidSignature)?;
    key.verify_sha256(canonical_signed_info(signed_info).as_bytes(), &signature_bytes)
}

fn document_digest(document: &XmlElement) -> String {
    let digest = Sha256::digest(document.canonical().as_bytes());
    general_purpose::STANDARD.encode(digest)
}

fn signed_info(digest: &str) -> XmlElement {
    XmlElement::new("SignedInfo")
        .with_child(XmlElement::new("CanonicalizationMethod").with_attribute("Algorithm", C14N_ALGORITHM))
        .with_child(XmlElement::new("SignatureMethod").with_attribute("Algorithm", RSA_SHA256_ALGORITHM))
        .with_child(
            XmlElement::new("Reference")
                .with_attribute("URI", "")
                .with_child(
                    XmlElement::new("Transforms").with_child(
                        XmlElement::new("Transform").with_attribute("Algorithm", ENVELOPED_TRANSFORM),
                    ),
                )
                .with_child(XmlElement::new("DigestMethod").with_attribute("Algorithm", SHA256_ALGORITHM))
                .with_child(XmlElement::new("DigestValue").with_text(digest)),
        )
}

// SignedInfo inherits the namespace declared on <Signature>.
fn canonical_signed_info(signed_info: &XmlElement) -> String {
    let mut scoped = signed_info.clone();
    if scoped.attribute("xmlns").is_none() {
        scoped.set_attribute("xmlns", XMLDSIG_NAMESPACE);
    }
    scoped.canonical()
}
