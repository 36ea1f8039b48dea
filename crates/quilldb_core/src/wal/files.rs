//! Log file descriptors and the file-opening policy.

use crate::dir::WalDir;
use crate::error::{WalError, WalResult};
use crate::types::SequenceNumber;
use quilldb_storage::FileBackend;
use std::cmp::Ordering;
use std::path::PathBuf;

/// Whether a log file is still being appended to or has been rotated out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileKind {
    /// A log in the live WAL directory.
    Live,
    /// A rotated-out log in the archive directory, retained for iterators.
    Archived,
}

/// Immutable metadata for a single WAL file.
///
/// Descriptors are snapshotted by the engine when it builds a candidate file
/// list for an iterator. Across such a list, log numbers strictly increase
/// and start sequences are non-decreasing.
#[derive(Debug, Clone)]
pub struct LogFileDescriptor {
    log_number: u64,
    kind: LogFileKind,
    start_sequence: SequenceNumber,
    size_bytes: u64,
}

impl LogFileDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        log_number: u64,
        kind: LogFileKind,
        start_sequence: SequenceNumber,
        size_bytes: u64,
    ) -> Self {
        Self {
            log_number,
            kind,
            start_sequence,
            size_bytes,
        }
    }

    /// Monotonic identifier naming the file.
    #[must_use]
    pub fn log_number(&self) -> u64 {
        self.log_number
    }

    /// Live or archived.
    #[must_use]
    pub fn kind(&self) -> LogFileKind {
        self.kind
    }

    /// Sequence number of the first batch in the file.
    #[must_use]
    pub fn start_sequence(&self) -> SequenceNumber {
        self.start_sequence
    }

    /// File size in bytes at snapshot time. Informational only.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Primary path of the file under `dir`, derived from its kind.
    #[must_use]
    pub fn path(&self, dir: &WalDir) -> PathBuf {
        match self.kind {
            LogFileKind::Live => dir.live_log_path(self.log_number),
            LogFileKind::Archived => dir.archived_log_path(self.log_number),
        }
    }
}

// Two files never share a log number, so the number alone orders and
// identifies descriptors.
impl PartialEq for LogFileDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.log_number == other.log_number
    }
}

impl Eq for LogFileDescriptor {}

impl PartialOrd for LogFileDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogFileDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.log_number.cmp(&other.log_number)
    }
}

/// Opens the storage behind a log file.
///
/// Archived files open from the archive directory. Live files open from the
/// live directory first; on any failure the archive directory is tried,
/// because the file may have been rotated out between the moment the file
/// list was snapshotted and now.
///
/// # Errors
///
/// Returns the archive-path error if both locations fail.
pub fn open_log_file(dir: &WalDir, file: &LogFileDescriptor) -> WalResult<FileBackend> {
    let archived = dir.archived_log_path(file.log_number());

    match file.kind() {
        LogFileKind::Archived => FileBackend::open(&archived)
            .map_err(|e| WalError::io_at(archived.display().to_string(), e.to_string())),
        LogFileKind::Live => {
            let live = dir.live_log_path(file.log_number());
            FileBackend::open(&live).or_else(|_| {
                FileBackend::open(&archived)
                    .map_err(|e| WalError::io_at(archived.display().to_string(), e.to_string()))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quilldb_storage::StorageBackend;
    use std::fs;
    use tempfile::tempdir;

    fn descriptor(log_number: u64, kind: LogFileKind) -> LogFileDescriptor {
        LogFileDescriptor::new(log_number, kind, SequenceNumber::new(1), 0)
    }

    #[test]
    fn ordered_by_log_number() {
        let mut files = vec![
            descriptor(9, LogFileKind::Live),
            descriptor(3, LogFileKind::Archived),
            descriptor(7, LogFileKind::Archived),
        ];
        files.sort();

        let numbers: Vec<_> = files.iter().map(LogFileDescriptor::log_number).collect();
        assert_eq!(numbers, vec![3, 7, 9]);
    }

    #[test]
    fn path_follows_kind() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        assert_eq!(
            descriptor(5, LogFileKind::Live).path(&dir),
            dir.live_log_path(5)
        );
        assert_eq!(
            descriptor(5, LogFileKind::Archived).path(&dir),
            dir.archived_log_path(5)
        );
    }

    #[test]
    fn opens_live_file() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        fs::write(dir.live_log_path(1), b"live bytes").unwrap();

        let backend = open_log_file(&dir, &descriptor(1, LogFileKind::Live)).unwrap();
        assert_eq!(backend.size().unwrap(), 10);
    }

    #[test]
    fn opens_archived_file() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        fs::write(dir.archived_log_path(2), b"archived").unwrap();

        let backend = open_log_file(&dir, &descriptor(2, LogFileKind::Archived)).unwrap();
        assert_eq!(backend.size().unwrap(), 8);
    }

    #[test]
    fn live_file_falls_back_to_archive() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        // The file list said Live, but the log was rotated out meanwhile.
        fs::write(dir.archived_log_path(4), b"rotated").unwrap();

        let backend = open_log_file(&dir, &descriptor(4, LogFileKind::Live)).unwrap();
        assert_eq!(backend.size().unwrap(), 7);
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        let err = open_log_file(&dir, &descriptor(6, LogFileKind::Live)).unwrap_err();
        assert!(matches!(err, WalError::Io { .. }));
        // The surfaced path is the archive path, the last one tried.
        assert!(err.to_string().contains("archive"));
    }
}
