//! ---
//! fls_section: "14-licensing"
//! fls_subsection: "module"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "License document signing, key material, and validation."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use tracing::info;

use crate::validator::LicenseDetails;

// Registration only fails on a duplicate name, which these fixed names rule out.
static LICENSE_LOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fls_license_loads_total",
        "Total number of license files that validated successfully"
    )
    .expect("metric registration to succeed")
});

static LICENSE_INVALID_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "fls_license_invalid_total",
        "Total number of license files rejected during validation",
        &["reason"]
    )
    .expect("metric registration to succeed")
});

/// Record a successful license validation event.
pub fn record_license_load(details: &LicenseDetails) {
    LICENSE_LOADS_TOTAL.inc();
    info!(
        user_id = %details.user_id,
        name = %details.name,
        kind = %details.kind,
        expiration = %details.expiration,
        "license accepted"
    );
}

/// Record a rejected license.
pub fn record_invalid_license(reason: &str) {
    LICENSE_INVALID_TOTAL.with_label_values(&[reason]).inc();
    info!(reason = reason, "license rejected");
}
