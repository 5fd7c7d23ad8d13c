//! ---
//! fls_section: "05-leasing"
//! fls_subsection: "tests"
//! fls_type: "source"
//! fls_scope: "test"
//! fls_description: "Concurrent access through the single-writer lease service."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
mod support;

use fls_lease::{LeaseError, LeaseService};
use fls_licensing::LicenseKind;
use support::*;
use tempfile::tempdir;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_oversubscribe_the_pool() {
    let dir = tempdir().unwrap();
    write_license(dir.path(), "alice.xml", "Alice", Uuid::new_v4(), LicenseKind::Standard);
    write_license(dir.path(), "bob.xml", "Bob", Uuid::new_v4(), LicenseKind::Standard);
    let (service, owner) = LeaseService::spawn(open(dir.path(), &clock()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .lease_license(format!("PC{i}"), "user", Uuid::new_v4())
                .await
        }));
    }
    let mut granted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_some() {
            granted += 1;
        }
    }
    assert_eq!(granted, 2);

    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.available, 0);
    assert_eq!(snapshot.leases.len(), 2);

    drop(service);
    let manager = tokio::task::spawn_blocking(move || owner.join().unwrap())
        .await
        .unwrap();
    assert_eq!(manager.leases().len(), 2);
}

#[tokio::test]
async fn requests_after_shutdown_report_service_stopped() {
    let dir = tempdir().unwrap();
    let (service, owner) = LeaseService::spawn(open(dir.path(), &clock()));
    assert_eq!(
        service
            .lease_license("PC1", "bob", Uuid::new_v4())
            .await
            .unwrap(),
        None
    );
    service.shutdown().await.unwrap();
    tokio::task::spawn_blocking(move || owner.join().unwrap())
        .await
        .unwrap();

    assert!(matches!(
        service.snapshot().await,
        Err(LeaseError::ServiceStopped)
    ));
    assert!(matches!(
        service.lease_license("PC1", "bob", Uuid::new_v4()).await,
        Err(LeaseError::ServiceStopped)
    ));
}
