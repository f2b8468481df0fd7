//! Accounting log files
//!
//! An [`AccountingLog`] treats a file as a zero-indexed array of
//! [`RECORD_SIZE`]-byte records. Reads are sequential from the file cursor;
//! [`AccountingLog::last_entry`], [`AccountingLog::read_entry`] and
//! [`AccountingLog::write_entry`] save and restore that cursor so they can be
//! interleaved with an [`Entries`] iteration on the same handle.
//!
//! The log assumes a single writer. Appends made through another handle are
//! not reflected in [`AccountingLog::num_entries`] until the log is reopened.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::PacctError;
use crate::mode::OpenMode;
use crate::params::SystemParams;
use crate::record::{AccountingRecord, RECORD_SIZE};

/// Configuration for an accounting log
#[derive(Debug, Clone, Default)]
pub struct AccountingLogConfig {
    /// Page size and tick rate handed to every decoded record
    pub params: SystemParams,
    /// Whether to sync each appended record to disk immediately
    pub sync_on_write: bool,
}

impl AccountingLogConfig {
    /// Create a config with the given host parameters
    pub fn with_params(params: SystemParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Set whether appends are synced to disk
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

enum LogState {
    Open(File),
    Closed,
}

/// An open (or closed) accounting log file
pub struct AccountingLog {
    path: PathBuf,
    mode: OpenMode,
    config: AccountingLogConfig,
    state: LogState,
    /// Entry count at open time plus our own appends
    num_entries: u64,
}

impl AccountingLog {
    /// Open `path` with an `fopen`-style mode string (`rb`, `wb`, `r+b`, `w+b`)
    pub fn open(
        path: impl AsRef<Path>,
        mode: &str,
        config: AccountingLogConfig,
    ) -> Result<Self, PacctError> {
        let mode: OpenMode = mode.parse()?;
        Self::open_with_mode(path, mode, config)
    }

    /// Open `path` with an already parsed mode.
    ///
    /// Fails with [`PacctError::MalformedLog`] if the file length is not a
    /// whole number of records; the handle is released before returning.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), mode = %mode))]
    pub fn open_with_mode(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: AccountingLogConfig,
    ) -> Result<Self, PacctError> {
        let path = path.as_ref().to_path_buf();

        let file = mode
            .options()
            .open(&path)
            .map_err(|e| PacctError::io(&path, e))?;

        let length = file
            .metadata()
            .map_err(|e| PacctError::io(&path, e))?
            .len();

        if length % RECORD_SIZE as u64 != 0 {
            warn!(length, record_size = RECORD_SIZE, "File is not a whole number of records");
            drop(file);
            return Err(PacctError::MalformedLog {
                path,
                length,
                record_size: RECORD_SIZE,
            });
        }

        let num_entries = length / RECORD_SIZE as u64;
        info!(entries = num_entries, "Opened accounting log");

        Ok(Self {
            path,
            mode,
            config,
            state: LogState::Open(file),
            num_entries,
        })
    }

    /// Number of records in the log
    pub fn num_entries(&self) -> Result<u64, PacctError> {
        match self.state {
            LogState::Open(_) => Ok(self.num_entries),
            LogState::Closed => Err(PacctError::LogClosed),
        }
    }

    /// Iterate over every record, starting at index 0
    pub fn entries(&mut self) -> Result<Entries<'_>, PacctError> {
        self.each_entry(0)
    }

    /// Iterate over records `start..num_entries()`.
    ///
    /// The end of the range is fixed when this is called. `start ==
    /// num_entries()` gives an empty iterator; anything larger is
    /// [`PacctError::IndexOutOfRange`].
    pub fn each_entry(&mut self, start: u64) -> Result<Entries<'_>, PacctError> {
        let end = self.num_entries()?;
        if start > end {
            return Err(PacctError::IndexOutOfRange {
                index: start,
                entries: end,
            });
        }

        let path = &self.path;
        let file = open_file(&mut self.state)?;
        file.seek(SeekFrom::Start(offset_of(start)))
            .map_err(|e| PacctError::io(path, e))?;

        debug!(start, end, "Iterating accounting log");
        Ok(Entries {
            log: self,
            next: start,
            end,
            failed: false,
        })
    }

    /// The final record, or `None` if the log is empty.
    ///
    /// The file cursor is left where it was.
    pub fn last_entry(&mut self) -> Result<Option<AccountingRecord>, PacctError> {
        let entries = self.num_entries()?;
        if entries == 0 {
            return Ok(None);
        }
        self.read_entry(entries - 1).map(Some)
    }

    /// Random access to the record at `index`, leaving the cursor untouched
    pub fn read_entry(&mut self, index: u64) -> Result<AccountingRecord, PacctError> {
        let entries = self.num_entries()?;
        if index >= entries {
            return Err(PacctError::IndexOutOfRange { index, entries });
        }

        let path = &self.path;
        let file = open_file(&mut self.state)?;
        let block = preserving_cursor(file, path, |file| {
            file.seek(SeekFrom::Start(offset_of(index)))?;
            read_block(file)
        })?;
        Ok(AccountingRecord::decode(&block, self.config.params))
    }

    /// Append one record and return its index.
    ///
    /// The file cursor is left where it was, so an in-progress iteration
    /// continues from the same record. If the write fails, anything already
    /// written for this record is truncated away and the count is unchanged.
    pub fn write_entry(&mut self, record: &AccountingRecord) -> Result<u64, PacctError> {
        let block = record.encode();
        let sync = self.config.sync_on_write;

        let path = &self.path;
        let file = open_file(&mut self.state)?;
        preserving_cursor(file, path, |file| {
            let length = file.seek(SeekFrom::End(0))?;
            let mut appended = file.write_all(&block);
            if appended.is_ok() && sync {
                appended = file.sync_data();
            }
            if let Err(e) = appended {
                // Drop any partial record so the file stays a whole number of records
                if let Err(truncate) = file.set_len(length) {
                    warn!(length, error = %truncate, "Failed to discard partial record");
                }
                return Err(e);
            }
            Ok(())
        })?;

        let index = self.num_entries;
        self.num_entries += 1;
        debug!(index, pid = record.process_id(), "Appended accounting record");
        Ok(index)
    }

    /// Current byte offset of the file cursor
    pub fn position(&mut self) -> Result<u64, PacctError> {
        let path = &self.path;
        open_file(&mut self.state)?
            .stream_position()
            .map_err(|e| PacctError::io(path, e))
    }

    /// Release the file handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), PacctError> {
        if let LogState::Open(file) = std::mem::replace(&mut self.state, LogState::Closed) {
            if self.config.sync_on_write && self.mode.is_writable() {
                file.sync_all().map_err(|e| PacctError::io(&self.path, e))?;
            }
            info!(path = %self.path.display(), entries = self.num_entries, "Closed accounting log");
        }
        Ok(())
    }

    /// Whether [`AccountingLog::close`] has been called
    pub fn is_closed(&self) -> bool {
        matches!(self.state, LogState::Closed)
    }

    /// Path the log was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the log was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Unit-conversion parameters given to decoded records
    pub fn params(&self) -> SystemParams {
        self.config.params
    }

    /// A blank record carrying this log's parameters
    pub fn new_record(&self) -> AccountingRecord {
        AccountingRecord::new_empty(self.config.params)
    }

    /// Read the record under the cursor and advance past it
    fn read_next(&mut self) -> Result<AccountingRecord, PacctError> {
        let path = &self.path;
        let file = open_file(&mut self.state)?;
        let block = read_block(file).map_err(|e| PacctError::io(path, e))?;
        Ok(AccountingRecord::decode(&block, self.config.params))
    }
}

impl std::fmt::Debug for AccountingLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingLog")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("open", &!self.is_closed())
            .field("num_entries", &self.num_entries)
            .finish()
    }
}

/// Iterator returned by [`AccountingLog::each_entry`].
///
/// Yields `(record, index)` pairs. A read error is yielded once and ends the
/// iteration. The log stays borrowed for the iterator's lifetime; use
/// [`Entries::last_entry`] and [`Entries::write_entry`] to reach it
/// mid-iteration.
pub struct Entries<'a> {
    log: &'a mut AccountingLog,
    next: u64,
    end: u64,
    failed: bool,
}

impl Entries<'_> {
    /// See [`AccountingLog::last_entry`]
    pub fn last_entry(&mut self) -> Result<Option<AccountingRecord>, PacctError> {
        self.log.last_entry()
    }

    /// See [`AccountingLog::write_entry`]. The new record is past this
    /// iterator's end and will not be yielded by it.
    pub fn write_entry(&mut self, record: &AccountingRecord) -> Result<u64, PacctError> {
        self.log.write_entry(record)
    }

    /// Index of the next record to be yielded
    pub fn next_index(&self) -> u64 {
        self.next
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<(AccountingRecord, u64), PacctError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.end {
            return None;
        }

        let index = self.next;
        match self.log.read_next() {
            Ok(record) => {
                self.next += 1;
                Some(Ok((record, index)))
            }
            Err(e) => {
                warn!(index, error = %e, "Read failed, ending iteration");
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        // A failed read still yields one item, so only the first is certain
        let remaining = (self.end - self.next) as usize;
        (remaining.min(1), Some(remaining))
    }
}

impl FusedIterator for Entries<'_> {}

fn open_file(state: &mut LogState) -> Result<&mut File, PacctError> {
    match state {
        LogState::Open(file) => Ok(file),
        LogState::Closed => Err(PacctError::LogClosed),
    }
}

fn offset_of(index: u64) -> u64 {
    index * RECORD_SIZE as u64
}

fn read_block(file: &mut File) -> io::Result<[u8; RECORD_SIZE]> {
    let mut block = [0u8; RECORD_SIZE];
    file.read_exact(&mut block)?;
    Ok(block)
}

/// Run `op`, then put the cursor back where it was even if `op` failed
fn preserving_cursor<T>(
    file: &mut File,
    path: &Path,
    op: impl FnOnce(&mut File) -> io::Result<T>,
) -> Result<T, PacctError> {
    let saved = file
        .stream_position()
        .map_err(|e| PacctError::io(path, e))?;
    let result = op(file);
    let restored = file.seek(SeekFrom::Start(saved));

    let value = result.map_err(|e| PacctError::io(path, e))?;
    restored.map_err(|e| PacctError::io(path, e))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> AccountingLogConfig {
        AccountingLogConfig::with_params(SystemParams::new(4096, 100).unwrap())
    }

    fn create_test_log(pids: &[u32]) -> (AccountingLog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pacct");
        let mut log = AccountingLog::open(&path, "w+b", config()).unwrap();
        for &pid in pids {
            let mut record = log.new_record();
            record.set_process_id(pid);
            log.write_entry(&record).unwrap();
        }
        (log, temp_dir)
    }

    fn pids(log: &mut AccountingLog, start: u64) -> Vec<(u32, u64)> {
        log.each_entry(start)
            .unwrap()
            .map(|entry| {
                let (record, index) = entry.unwrap();
                (record.process_id(), index)
            })
            .collect()
    }

    #[test]
    fn test_write_then_iterate() {
        let (mut log, _temp) = create_test_log(&[10, 20, 30]);
        assert_eq!(log.num_entries().unwrap(), 3);
        assert_eq!(pids(&mut log, 0), vec![(10, 0), (20, 1), (30, 2)]);
        assert_eq!(pids(&mut log, 1), vec![(20, 1), (30, 2)]);
    }

    #[test]
    fn test_each_entry_bounds() {
        let (mut log, _temp) = create_test_log(&[1, 2]);
        assert!(pids(&mut log, 2).is_empty());
        assert!(matches!(
            log.each_entry(3),
            Err(PacctError::IndexOutOfRange { index: 3, entries: 2 })
        ));
    }

    #[test]
    fn test_last_entry() {
        let (mut log, _temp) = create_test_log(&[]);
        assert!(log.last_entry().unwrap().is_none());

        let mut record = log.new_record();
        record.set_process_id(99);
        log.write_entry(&record).unwrap();
        assert_eq!(log.last_entry().unwrap().unwrap().process_id(), 99);
    }

    #[test]
    fn test_last_entry_matches_final_iteration_element() {
        let (mut log, _temp) = create_test_log(&[5, 6, 7]);
        let last = log.last_entry().unwrap().unwrap();
        let (from_iter, index) = log.each_entry(2).unwrap().next().unwrap().unwrap();
        assert_eq!(index, 2);
        assert_eq!(last, from_iter);
    }

    #[test]
    fn test_write_preserves_cursor() {
        let (mut log, _temp) = create_test_log(&[10, 20, 30]);
        {
            let mut entries = log.each_entry(0).unwrap();
            entries.next().unwrap().unwrap();
        }
        assert_eq!(log.position().unwrap(), RECORD_SIZE as u64);

        let mut record = log.new_record();
        record.set_process_id(40);
        assert_eq!(log.write_entry(&record).unwrap(), 3);

        assert_eq!(log.position().unwrap(), RECORD_SIZE as u64);
        assert_eq!(log.num_entries().unwrap(), 4);
    }

    #[test]
    fn test_interleaved_operations_during_iteration() {
        let (mut log, _temp) = create_test_log(&[10, 20, 30]);
        let mut appended = log.new_record();
        appended.set_process_id(40);

        let mut entries = log.each_entry(0).unwrap();
        let (first, _) = entries.next().unwrap().unwrap();
        assert_eq!(first.process_id(), 10);

        assert_eq!(entries.last_entry().unwrap().unwrap().process_id(), 30);
        entries.write_entry(&appended).unwrap();
        assert_eq!(entries.last_entry().unwrap().unwrap().process_id(), 40);

        let rest: Vec<u32> = entries.map(|e| e.unwrap().0.process_id()).collect();
        assert_eq!(rest, vec![20, 30]);

        assert_eq!(log.num_entries().unwrap(), 4);
        assert_eq!(pids(&mut log, 3), vec![(40, 3)]);
    }

    #[test]
    fn test_read_entry() {
        let (mut log, _temp) = create_test_log(&[10, 20, 30]);
        let before = log.position().unwrap();
        assert_eq!(log.read_entry(1).unwrap().process_id(), 20);
        assert_eq!(log.position().unwrap(), before);
        assert!(matches!(
            log.read_entry(3),
            Err(PacctError::IndexOutOfRange { index: 3, entries: 3 })
        ));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let (mut log, _temp) = create_test_log(&[1]);
        log.close().unwrap();
        log.close().unwrap();
        assert!(log.is_closed());

        let record = log.new_record();
        assert!(matches!(log.num_entries(), Err(PacctError::LogClosed)));
        assert!(matches!(log.each_entry(0), Err(PacctError::LogClosed)));
        assert!(matches!(log.last_entry(), Err(PacctError::LogClosed)));
        assert!(matches!(log.read_entry(0), Err(PacctError::LogClosed)));
        assert!(matches!(log.write_entry(&record), Err(PacctError::LogClosed)));
        assert!(matches!(log.position(), Err(PacctError::LogClosed)));
    }

    #[test]
    fn test_read_failure_ends_iteration() {
        let (mut log, temp) = create_test_log(&[1, 2, 3]);
        // Shrink the file behind the log's back so the cached count is stale
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(temp.path().join("pacct"))
            .unwrap();
        file.set_len(RECORD_SIZE as u64).unwrap();

        let results: Vec<_> = log.each_entry(0).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PacctError::Io { .. })));
    }

    #[test]
    fn test_size_hint_bounds() {
        let (mut log, _temp) = create_test_log(&[1, 2, 3]);
        let mut entries = log.each_entry(1).unwrap();
        assert_eq!(entries.size_hint(), (1, Some(2)));
        entries.next().unwrap().unwrap();
        entries.next().unwrap().unwrap();
        assert_eq!(entries.size_hint(), (0, Some(0)));
        assert!(entries.next().is_none());
    }
}
