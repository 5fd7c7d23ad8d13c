//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use strum::{Display, EnumString};

/// Entitlement kind recorded in the `kind` attribute of a license document.
///
/// The textual form is the variant name (`Standard`, `Floating`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LicenseKind {
    /// No entitlement.
    #[default]
    None,
    /// Time-limited evaluation.
    Trial,
    /// Regular per-user license; the only kind the lease pool accepts.
    Standard,
    /// Single-user personal license.
    Personal,
    /// Short-lived license minted by a lease server.
    Floating,
    /// Recurring subscription.
    Subscription,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_form_is_variant_name() {
        assert_eq!(LicenseKind::Standard.to_string(), "Standard");
        assert_eq!(LicenseKind::Floating.to_string(), "Floating");
        assert_eq!("Subscription".parse::<LicenseKind>().unwrap(), LicenseKind::Subscription);
        assert_eq!("trial".parse::<LicenseKind>().unwrap(), LicenseKind::Trial);
        assert!("Enterprise".parse::<LicenseKind>().is_err());
    }
}
