mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::events_csv;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let csv = events_csv(&["sweep,,,,2024-03-01,,"]).unwrap();

    let mut cmd = Command::new(cargo_bin!("lending-desk"));
    cmd.env_remove("RUST_LOG")
        .arg(csv.path())
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back to in-memory storage"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let csv = events_csv(&["sweep,,,,2024-03-01,,"]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("lending-desk"));
    cmd.env_remove("RUST_LOG")
        .arg(csv.path())
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Falling back").not());
}
