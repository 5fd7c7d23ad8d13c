//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "tests"
//! fls_type: "source"
//! fls_scope: "test"
//! fls_description: "Shared fixtures for lease manager tests."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fls_common::time::ManualClock;
use fls_lease::{LeaseManager, LeaseManagerConfig, LICENSES_DIRECTORY};
use fls_licensing::{generate_license, LicenseAttributes, LicenseKind};
use uuid::Uuid;

pub const SOFTWARE_PRIVATE: &str = include_str!("../../../../configs/keys/software.private.xml");
pub const SOFTWARE_PUBLIC: &str = include_str!("../../../../configs/keys/software.public.xml");
pub const SERVER_PRIVATE: &str = include_str!("../../../../configs/keys/server.private.xml");
pub const SERVER_PUBLIC: &str = include_str!("../../../../configs/keys/server.public.xml");

/// Whole-second start so persisted timestamps compare exactly.
pub fn start() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_opt(now.timestamp(), 0).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start()))
}

pub fn config(base: &Path) -> LeaseManagerConfig {
    LeaseManagerConfig::new(SOFTWARE_PUBLIC, SERVER_PRIVATE, base)
}

pub fn open(base: &Path, clock: &Arc<ManualClock>) -> LeaseManager {
    LeaseManager::open_with_clock(config(base), clock.clone()).unwrap()
}

/// Sign and drop a license file into `base/Licenses`.
pub fn write_license(base: &Path, file: &str, name: &str, user_id: Uuid, kind: LicenseKind) {
    write_license_expiring(base, file, name, user_id, kind, Utc::now() + Duration::days(365));
}

pub fn write_license_expiring(
    base: &Path,
    file: &str,
    name: &str,
    user_id: Uuid,
    kind: LicenseKind,
    expiration: DateTime<Utc>,
) {
    let mut attributes = LicenseAttributes::new();
    attributes.insert("seats".to_owned(), "1".to_owned());
    let raw = generate_license(SOFTWARE_PRIVATE, name, user_id, expiration, &attributes, kind)
        .unwrap();
    let dir = base.join(LICENSES_DIRECTORY);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), raw).unwrap();
}
