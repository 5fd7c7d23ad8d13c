//! ---
//! fls_section: "07-administration"
//! fls_subsection: "tests"
//! fls_type: "source"
//! fls_scope: "test"
//! fls_description: "End-to-end checks of the flsctl binary."
//! fls_version: "v0.0.0-prealpha"
//! fls_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::tempdir;

fn key(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs/keys")
        .join(name)
}

fn flsctl() -> Command {
    let mut cmd = Command::cargo_bin("flsctl").unwrap();
    cmd.env_remove("FLS_CONFIG");
    cmd
}

#[test]
fn generated_license_verifies() {
    let dir = tempdir().unwrap();
    let license = dir.path().join("alice.xml");
    flsctl()
        .args(["license", "generate", "--name", "Alice", "--days", "30"])
        .args(["--attribute", "edition=pro", "--kind", "standard"])
        .arg("--private-key")
        .arg(key("software.private.xml"))
        .arg("--output")
        .arg(&license)
        .assert()
        .success();

    let output = flsctl()
        .args(["license", "verify"])
        .arg("--public-key")
        .arg(key("software.public.xml"))
        .arg("--license")
        .arg(&license)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Name: Alice"));
    assert!(stdout.contains("Kind: Standard"));
    assert!(stdout.contains("edition: pro"));
}

#[test]
fn verify_rejects_wrong_key_and_floating_documents() {
    let dir = tempdir().unwrap();
    let floating = dir.path().join("floating.xml");
    flsctl()
        .args(["license", "floating", "--name", "Acme"])
        .arg("--private-key")
        .arg(key("software.private.xml"))
        .arg("--public-key")
        .arg(key("server.public.xml"))
        .arg("--output")
        .arg(&floating)
        .assert()
        .success();

    flsctl()
        .args(["license", "verify"])
        .arg("--public-key")
        .arg(key("software.public.xml"))
        .arg("--license")
        .arg(&floating)
        .assert()
        .failure();

    flsctl()
        .args(["license", "verify"])
        .arg("--public-key")
        .arg(key("server.public.xml"))
        .arg("--license")
        .arg(&floating)
        .assert()
        .failure();
}

#[test]
fn lease_request_and_status_share_state() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("server");
    fs::create_dir_all(base.join("Licenses")).unwrap();
    let config = dir.path().join("fls.toml");
    fs::write(
        &config,
        format!(
            "[licensing]\nbase_directory = {:?}\nsoftware_public_key = {{ path = {:?} }}\nserver_private_key = {{ path = {:?} }}\n[logging]\ndirectory = {:?}\n",
            base.display().to_string(),
            key("software.public.xml").display().to_string(),
            key("server.private.xml").display().to_string(),
            dir.path().join("logs").display().to_string(),
        ),
    )
    .unwrap();

    flsctl()
        .args(["license", "generate", "--name", "Alice", "--days", "30"])
        .arg("--private-key")
        .arg(key("software.private.xml"))
        .arg("--output")
        .arg(base.join("Licenses/alice.xml"))
        .assert()
        .success();

    let output = flsctl()
        .args(["lease", "request", "--machine", "PC1", "--user", "bob"])
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("kind=\"Floating\""));
    assert!(stdout.contains("Alice"));

    let output = flsctl()
        .args(["lease", "request", "--machine", "PC2", "--user", "carol"])
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(String::from_utf8(output.stdout).unwrap().contains("No license available"));

    let output = flsctl()
        .args(["lease", "status", "--json"])
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["available"], 0);
    assert_eq!(snapshot["leases"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["leases"][0]["name"], "Alice");
}

#[test]
fn lease_request_without_keys_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("fls.toml");
    fs::write(
        &config,
        format!(
            "[licensing]\nbase_directory = {:?}\nsoftware_public_key = {{ env_var = \"FLS_TEST_UNSET_PUBLIC\" }}\nserver_private_key = {{ env_var = \"FLS_TEST_UNSET_PRIVATE\" }}\n[logging]\ndirectory = {:?}\n",
            dir.path().display().to_string(),
            dir.path().join("logs").display().to_string()
        ),
    )
    .unwrap();
    flsctl()
        .args(["lease", "request", "--machine", "PC1", "--user", "bob"])
        .arg("--config")
        .arg(&config)
        .env_remove("FLS_TEST_UNSET_PUBLIC")
        .env_remove("FLS_TEST_UNSET_PRIVATE")
        .assert()
        .failure();
}
