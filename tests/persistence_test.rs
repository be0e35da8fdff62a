#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use common::{events_csv, small_library};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let config = small_library().unwrap();

    // 1. First run: borrow and return late
    let csv1 = events_csv(&["borrow,1,1,1,2024-03-01,,", "return,1,,,2024-03-19,,"]).unwrap();

    let mut cmd1 = Command::new(cargo_bin!("lending-desk"));
    cmd1.arg(csv1.path())
        .arg("--config")
        .arg(config.path())
        .arg("--db-path")
        .arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,INV-2024-00001,1,1,unpaid,1.00,0.00,1.00,2024-04-02"));

    // 2. Second run: pay the invoice and borrow again using the same DB path
    let csv2 = events_csv(&[
        "pay,1,,,2024-03-20,1.00,",
        "borrow,2,1,1,2024-03-21,,",
        "lost,2,,,2024-03-22,,",
    ])
    .unwrap();

    let mut cmd2 = Command::new(cargo_bin!("lending-desk"));
    cmd2.arg(csv2.path())
        .arg("--config")
        .arg(config.path())
        .arg("--db-path")
        .arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The first invoice survived the restart, and numbering continues after it
    assert!(stdout2.contains("1,INV-2024-00001,1,1,paid,1.00,1.00,0.00,2024-04-02"));
    assert!(stdout2.contains("2,INV-2024-00002,2,1,unpaid,20.00,0.00,20.00,2024-04-05"));
}
