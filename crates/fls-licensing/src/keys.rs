//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
//! RSA key material in the `<RSAKeyValue>` XML interchange format.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use ring::rand::SystemRandom;
use ring::rsa::{KeyPairComponents, PublicKeyComponents};
use ring::signature::{self, RsaKeyPair};

use crate::error::{LicenseError, LicenseResult};
use crate::xml::XmlElement;

const KEY_ROOT: &str = "RSAKeyValue";

/// RSA public key used to verify license signatures.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl RsaPublicKey {
    /// Parse a `<RSAKeyValue>` blob containing at least `Modulus` and `Exponent`.
    ///
    /// Private components, when present, are ignored.
    pub fn from_xml(xml: &str) -> LicenseResult<Self> {
        let root = parse_key_root(xml)?;
        Ok(Self {
            modulus: component(&root, "Modulus")?,
            exponent: component(&root, "Exponent")?,
        })
    }

    /// Render the public half as a `<RSAKeyValue>` blob.
    pub fn to_xml(&self) -> String {
        format!(
            "<{KEY_ROOT}><Modulus>{}</Modulus><Exponent>{}</Exponent></{KEY_ROOT}>",
            general_purpose::STANDARD.encode(&self.modulus),
            general_purpose::STANDARD.encode(&self.exponent)
        )
    }

    /// Verify an RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    pub fn verify_sha256(&self, message: &[u8], signature_bytes: &[u8]) -> LicenseResult<()> {
        let key = signature::RsaPublicKeyComponents {
            n: &self.modulus,
            e: &self.exponent,
        };
        key.verify(
            &signature::RSA_PKCS1_2048_8192_SHA256,
            message,
            signature_bytes,
        )
        .map_err(|_| LicenseError::InvalidSignature)
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("modulus_bits", &(self.modulus.len() * 8))
            .finish()
    }
}

/// RSA private key used to sign license documents.
pub struct RsaPrivateKey {
    key_pair: RsaKeyPair,
    public: RsaPublicKey,
}

impl RsaPrivateKey {
    /// Parse a full `<RSAKeyValue>` blob (`Modulus`, `Exponent`, `P`, `Q`,
    /// `DP`, `DQ`, `InverseQ`, `D`).
    pub fn from_xml(xml: &str) -> LicenseResult<Self> {
        let root = parse_key_root(xml)?;
        let public = RsaPublicKey {
            modulus: component(&root, "Modulus")?,
            exponent: component(&root, "Exponent")?,
        };
        let components = KeyPairComponents {
            public_key: PublicKeyComponents {
                n: public.modulus.clone(),
                e: public.exponent.clone(),
            },
            d: component(&root, "D")?,
            p: component(&root, "P")?,
            q: component(&root, "Q")?,
            dP: component(&root, "DP")?,
            dQ: component(&root, "DQ")?,
            qInv: component(&root, "InverseQ")?,
        };
        let key_pair = RsaKeyPair::from_components(&components)
            .map_err(|err| LicenseError::InvalidKey(format!("rsa key rejected: {err}")))?;
        Ok(Self { key_pair, public })
    }

    /// Public half of this key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Produce an RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    pub fn sign_sha256(&self, message: &[u8]) -> LicenseResult<Vec<u8>> {
        let rng = SystemRandom::new();
        let mut signature_bytes = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &signature::RSA_PKCS1_SHA256,
                &rng,
                message,
                &mut signature_bytes,
            )
            .map_err(|_| LicenseError::Signing("rsa signing failed".to_owned()))?;
        Ok(signature_bytes)
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

fn parse_key_root(xml: &str) -> LicenseResult<XmlElement> {
    let root = XmlElement::parse(xml.trim())
        .map_err(|err| LicenseError::InvalidKey(format!("key is not valid xml: {err}")))?;
    if root.name != KEY_ROOT {
        return Err(LicenseError::InvalidKey(format!(
            "expected <{KEY_ROOT}> root, found <{}>",
            root.name
        )));
    }
    Ok(root)
}

fn component(root: &XmlElement, name: &str) -> LicenseResult<Vec<u8>> {
    let element = root
        .child(name)
        .ok_or_else(|| LicenseError::InvalidKey(format!("missing <{name}> component")))?;
    let bytes = general_purpose::STANDARD
        .decode(element.text())
        .map_err(|err| LicenseError::InvalidKey(format!("<{name}> is not base64: {err}")))?;
    let first_significant = bytes.iter().position(|byte| *byte != 0).unwrap_or(bytes.len());
    if first_significant == bytes.len() {
        return Err(LicenseError::InvalidKey(format!("<{name}> is zero")));
    }
    Ok(bytes[first_significant..].to_vec())
}
