//! Interrupt cleanup of reserved outputs.

#![allow(clippy::unwrap_used)]

use sacmerge::pipeline::{OutputReservation, cleanup_all_reservations};
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cleanup_removes_uncommitted_reservations() {
    let dir = TempDir::new().unwrap();
    let pending = OutputReservation::reserve(dir.path(), "m_STA01.60-90.sac").unwrap();
    let path = pending.path().to_path_buf();
    assert!(path.exists());

    cleanup_all_reservations();
    assert!(!path.exists());
    drop(pending);
}

#[test]
#[serial]
fn test_cleanup_keeps_committed_outputs() {
    let dir = TempDir::new().unwrap();
    let done = OutputReservation::reserve(dir.path(), "m_STA01.60-90.sac")
        .unwrap()
        .commit();

    cleanup_all_reservations();
    assert!(done.exists());
}
