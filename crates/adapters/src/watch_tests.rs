use std::fs;
use std::thread::sleep;
use std::time::Duration;

use super::*;

fn settle() {
    sleep(Duration::from_millis(200));
}

#[test]
fn write_under_a_watched_path_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("watched");
    fs::write(&file, b"initial").expect("write");

    let watch = arm(&file).expect("arm");
    fs::write(&file, b"changed").expect("rewrite");
    settle();

    let events = watch.poll();
    assert!(!events.is_empty());
}

#[test]
fn delete_invalidates_the_descriptor() {
    assert!(VnodeEvent::Delete.invalidates_descriptor());
    assert!(VnodeEvent::Rename.invalidates_descriptor());
    assert!(VnodeEvent::Revoke.invalidates_descriptor());
    assert!(!VnodeEvent::Write.invalidates_descriptor());
    assert!(!VnodeEvent::Attrib.invalidates_descriptor());
}

#[test]
fn empty_queue_directory_scans_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scan = scan_queue_directory(dir.path()).expect("scan");
    assert!(!scan.non_empty);
    assert!(!scan.truncated);
}

#[test]
fn non_empty_queue_directory_scans_as_non_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("item-1"), b"x").expect("write");
    let scan = scan_queue_directory(dir.path()).expect("scan");
    assert!(scan.non_empty);
    assert!(!scan.truncated);
}

#[test]
fn hidden_entries_do_not_count_as_non_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(".hidden"), b"x").expect("write");
    let scan = scan_queue_directory(dir.path()).expect("scan");
    assert!(!scan.non_empty);
}
