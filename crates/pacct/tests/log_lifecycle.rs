//! End-to-end tests for accounting log files
//!
//! These exercise the public API the way a collector would: create a log,
//! append, close, reopen and read back.

use std::path::Path;

use chrono::{TimeZone, Utc};
use pacct::{
    AccountingLog, AccountingLogConfig, AccountingRecord, OpenMode, PacctError, RECORD_SIZE,
    StaticDirectory, SystemParams,
};
use tempfile::TempDir;

fn config() -> AccountingLogConfig {
    AccountingLogConfig::with_params(SystemParams::new(4096, 100).unwrap())
}

fn record(log: &AccountingLog, pid: u32) -> AccountingRecord {
    let mut record = log.new_record();
    record.set_process_id(pid);
    record.set_command_name("test");
    record
}

fn write_bytes(path: &Path, len: usize) {
    std::fs::write(path, vec![0u8; len]).unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_create_append_reopen_read() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    let mut log = AccountingLog::open(&path, "w+b", config()).unwrap();
    for pid in [10, 20, 30] {
        let entry = record(&log, pid);
        log.write_entry(&entry).unwrap();
    }
    log.close().unwrap();

    let mut log = AccountingLog::open(&path, "rb", config()).unwrap();
    assert_eq!(log.num_entries().unwrap(), 3);

    let read: Vec<(u32, u64)> = log
        .entries()
        .unwrap()
        .map(|entry| {
            let (record, index) = entry.unwrap();
            (record.process_id(), index)
        })
        .collect();
    assert_eq!(read, vec![(10, 0), (20, 1), (30, 2)]);

    assert_eq!(log.last_entry().unwrap().unwrap().process_id(), 30);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * RECORD_SIZE as u64);
}

#[test]
fn test_reopen_read_write_appends_after_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    let mut log = AccountingLog::open(&path, "wb", config()).unwrap();
    let entry = record(&log, 1);
    log.write_entry(&entry).unwrap();
    log.close().unwrap();

    let mut log = AccountingLog::open(&path, "r+b", config()).unwrap();
    assert_eq!(log.num_entries().unwrap(), 1);
    let entry = record(&log, 2);
    assert_eq!(log.write_entry(&entry).unwrap(), 1);
    assert_eq!(log.read_entry(0).unwrap().process_id(), 1);
    assert_eq!(log.read_entry(1).unwrap().process_id(), 2);
}

#[test]
fn test_full_record_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");
    let dir = StaticDirectory::new()
        .with_user(1000, "alice")
        .with_group(100, "users");

    let mut log = AccountingLog::open(&path, "w+b", config()).unwrap();
    let mut written = log.new_record();
    written.set_process_id(4242);
    written.set_user_name(&dir, "alice").unwrap();
    written.set_group_name(&dir, "users").unwrap();
    written.set_command_name("cc1plus-with-a-long-name");
    written.set_user_time(12);
    written.set_system_time(3);
    written.set_wall_time(20.0);
    written.set_start_time(Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).unwrap());
    written.set_average_memory(1000);
    written.set_exit_code(1);
    log.write_entry(&written).unwrap();
    log.close().unwrap();

    let mut log = AccountingLog::open(&path, "rb", config()).unwrap();
    let read = log.last_entry().unwrap().unwrap();
    assert_eq!(read, written);
    assert_eq!(read.user_name(&dir).unwrap(), "alice");
    assert_eq!(read.group_name(&dir).unwrap(), "users");
    assert_eq!(read.command_name(), "cc1plus-with-a-");
    assert_eq!(read.cpu_time(), 15);
    assert_eq!(read.wall_time(), 20.0);
    assert_eq!(read.average_memory(), 1000);
    assert_eq!(read.start_time().timestamp(), 1_325_376_000);
}

#[test]
fn test_truncating_modes_discard_existing_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    for mode in ["wb", "w+b"] {
        write_bytes(&path, 2 * RECORD_SIZE);
        let log = AccountingLog::open(&path, mode, config()).unwrap();
        assert_eq!(log.num_entries().unwrap(), 0, "mode {mode}");
    }
}

// ============================================================================
// Open failures
// ============================================================================

#[test]
fn test_malformed_length_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    for len in [1, RECORD_SIZE - 1, RECORD_SIZE + 1, 3 * RECORD_SIZE + 17] {
        write_bytes(&path, len);
        for mode in [OpenMode::Read, OpenMode::ReadWrite] {
            let err = AccountingLog::open_with_mode(&path, mode, config()).unwrap_err();
            assert!(
                matches!(err, PacctError::MalformedLog { length, .. } if length == len as u64),
                "length {len} mode {mode}: {err}"
            );
        }
        // The log does not clean up after a failed open
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len as u64);
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("does-not-exist");

    for mode in ["rb", "r+b"] {
        let err = AccountingLog::open(&path, mode, config()).unwrap_err();
        match err {
            PacctError::Io { path: ref p, .. } => assert_eq!(p, &path),
            ref other => panic!("expected Io error, got {other:?}"),
        }
        assert_eq!(err.raw_os_error(), Some(2));
    }
    assert!(!path.exists());
}

#[test]
fn test_invalid_mode_does_not_touch_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    let err = AccountingLog::open(&path, "a+", config()).unwrap_err();
    assert!(matches!(err, PacctError::InvalidMode(ref m) if m == "a+"));
    assert!(!path.exists());
}

// ============================================================================
// Access mode enforcement
// ============================================================================

#[test]
fn test_write_to_read_only_log_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");
    write_bytes(&path, RECORD_SIZE);

    let mut log = AccountingLog::open(&path, "rb", config()).unwrap();
    let entry = record(&log, 7);
    assert!(matches!(log.write_entry(&entry), Err(PacctError::Io { .. })));
    // A failed append does not change the count
    assert_eq!(log.num_entries().unwrap(), 1);
}

#[test]
fn test_read_from_write_only_log_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    let mut log = AccountingLog::open(&path, "wb", config()).unwrap();
    let entry = record(&log, 7);
    log.write_entry(&entry).unwrap();

    assert!(matches!(log.last_entry(), Err(PacctError::Io { .. })));
    let mut entries = log.entries().unwrap();
    assert!(matches!(entries.next(), Some(Err(PacctError::Io { .. }))));
    assert!(entries.next().is_none());
}

// ============================================================================
// Cursor discipline
// ============================================================================

#[test]
fn test_appends_during_iteration_do_not_disturb_it() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pacct");

    let mut log = AccountingLog::open(&path, "w+b", config()).unwrap();
    for pid in 0..5 {
        let entry = record(&log, pid);
        log.write_entry(&entry).unwrap();
    }

    let extra = record(&log, 100);
    let mut seen = Vec::new();
    let mut entries = log.each_entry(1).unwrap();
    while let Some(entry) = entries.next() {
        let (record, index) = entry.unwrap();
        seen.push((record.process_id(), index));
        entries.write_entry(&extra).unwrap();
    }

    assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3), (4, 4)]);
    assert_eq!(log.num_entries().unwrap(), 9);
    assert_eq!(log.last_entry().unwrap().unwrap().process_id(), 100);
}
