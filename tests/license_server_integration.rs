//! ---
//! fls_section: "15-testing-qa-runbook"
//! fls_subsection: "integration-tests"
//! fls_type: "source"
//! fls_scope: "code"
//! fls_description: "Integration and validation tests for the license server stack."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use fls_common::time::{Clock, OffsetClock};
use fls_lease::{LeaseManager, LeaseManagerConfig, LeaseMetrics, LeaseService, LICENSES_DIRECTORY};
use fls_licensing::{LicenseAttributes, LicenseGenerator, LicenseKind, LicenseValidator};
use fls_persistence::STATE_FILE_NAME;
use fls_sntp::{server_reply, SntpClient};
use prometheus::Registry;
use tempfile::tempdir;
use tokio::net::UdpSocket;
use uuid::Uuid;

const SOFTWARE_PRIVATE: &str = include_str!("../configs/keys/software.private.xml");
const SOFTWARE_PUBLIC: &str = include_str!("../configs/keys/software.public.xml");
const SERVER_PRIVATE: &str = include_str!("../configs/keys/server.private.xml");
const SERVER_PUBLIC: &str = include_str!("../configs/keys/server.public.xml");

fn issue(base: &Path, file: &str, name: &str, kind: LicenseKind) -> Uuid {
    let generator = LicenseGenerator::new(SOFTWARE_PRIVATE).unwrap();
    let id = Uuid::new_v4();
    let mut attributes = LicenseAttributes::new();
    attributes.insert("product".to_owned(), "designer".to_owned());
    let document = generator
        .generate(name, id, Utc::now() + Duration::days(90), Some(&attributes), kind)
        .unwrap();
    let dir = base.join(LICENSES_DIRECTORY);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), document).unwrap();
    id
}

/// Local SNTP server answering every request with the current time.
async fn spawn_time_server() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buffer = [0u8; 64];
        while let Ok((_, peer)) = socket.recv_from(&mut buffer).await {
            let _ = socket.send_to(&server_reply(Utc::now()), peer).await;
        }
    });
    port
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trusted_time_issuance_and_leasing_end_to_end() {
    let port = spawn_time_server().await;
    let trusted = SntpClient::new(["unreachable.invalid", "127.0.0.1"])
        .with_port(port)
        .get_date()
        .await
        .expect("local time server answers");
    let clock = Arc::new(OffsetClock::from_trusted(trusted));
    assert!(clock.offset().num_seconds().abs() < 5);

    let dir = tempdir().unwrap();
    let alice = issue(dir.path(), "alice.xml", "Alice", LicenseKind::Standard);
    issue(dir.path(), "trial.xml", "Trial User", LicenseKind::Trial);

    let registry = Arc::new(Registry::new());
    let manager = LeaseManager::open_with_clock(
        LeaseManagerConfig::new(SOFTWARE_PUBLIC, SERVER_PRIVATE, dir.path()),
        clock.clone(),
    )
    .unwrap()
    .with_metrics(LeaseMetrics::new(registry.clone()).unwrap());
    assert_eq!(manager.available(), 1);

    let (service, owner) = LeaseService::spawn(manager);
    let g1 = Uuid::new_v4();
    let minted = service
        .lease_license("PC1", "bob", g1)
        .await
        .unwrap()
        .expect("pool has a license");
    assert!(service
        .lease_license("PC2", "carol", Uuid::new_v4())
        .await
        .unwrap()
        .is_none());

    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.available, 0);
    assert_eq!(snapshot.leases[0].identifier, format!("PC1\\bob :{g1}"));
    assert_eq!(snapshot.leases[0].user_id, alice);

    let minted_path = dir.path().join("minted.xml");
    fs::write(&minted_path, minted).unwrap();
    let mut validator = LicenseValidator::new(SERVER_PUBLIC, &minted_path);
    validator.assert_valid_license_at(clock.now()).unwrap();
    assert_eq!(validator.name(), "Alice");
    assert_eq!(validator.license_kind(), LicenseKind::Floating);
    assert_eq!(
        validator.license_attributes().get("product").map(String::as_str),
        Some("designer")
    );

    drop(service);
    tokio::task::spawn_blocking(move || owner.join().unwrap())
        .await
        .unwrap();

    assert!(dir.path().join(STATE_FILE_NAME).is_file());
    let restarted = LeaseManager::open_with_clock(
        LeaseManagerConfig::new(SOFTWARE_PUBLIC, SERVER_PRIVATE, dir.path()),
        clock,
    )
    .unwrap();
    // The state file keeps 100 ns ticks; the trusted clock has finer resolution.
    let restored = restarted.snapshot();
    assert_eq!(restored.available, 0);
    assert_eq!(restored.leases.len(), 1);
    assert_eq!(restored.leases[0].identifier, snapshot.leases[0].identifier);
    assert_eq!(restored.leases[0].user_id, alice);
    let drift = restored.leases[0].renewed_at - snapshot.leases[0].renewed_at;
    assert!(drift.abs() < Duration::microseconds(1));
}

#[test]
fn floating_license_files_never_enter_the_pool() {
    let dir = tempdir().unwrap();
    let generator = LicenseGenerator::new(SOFTWARE_PRIVATE).unwrap();
    let licenses = dir.path().join(LICENSES_DIRECTORY);
    fs::create_dir_all(&licenses).unwrap();
    fs::write(
        licenses.join("floating.xml"),
        generator
            .generate_floating_license("Acme", SERVER_PUBLIC)
            .unwrap(),
    )
    .unwrap();

    let manager = LeaseManager::open(LeaseManagerConfig::new(
        SOFTWARE_PUBLIC,
        SERVER_PRIVATE,
        dir.path(),
    ))
    .unwrap();
    assert_eq!(manager.loaded(), 0);
    assert_eq!(manager.available(), 0);
}
