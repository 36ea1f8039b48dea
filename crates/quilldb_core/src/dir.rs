//! WAL directory management.
//!
//! This module handles the file system layout for QuillDB's write-ahead
//! logs:
//!
//! ```text
//! <db_path>/
//! └─ wal/
//!    ├─ wal-000007.log      # live logs, appended by the writer
//!    └─ archive/
//!       └─ wal-000003.log   # rotated-out logs kept for iterators
//! ```
//!
//! A rotated log keeps its file name and moves into `archive/`. Readers that
//! snapshotted a file list before a rotation fall back from the live path to
//! the archived path when opening.

use crate::error::{WalError, WalResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names within the database directory.
const WAL_DIR: &str = "wal";
const ARCHIVE_DIR: &str = "archive";

/// Manages the WAL directory structure and path derivation.
///
/// `WalDir` only derives paths and (optionally) creates the directory
/// skeleton. The transaction-log iterator never creates, deletes, or writes
/// files through it.
#[derive(Debug, Clone)]
pub struct WalDir {
    /// Root database directory path.
    path: PathBuf,
}

impl WalDir {
    /// Opens the WAL directory layout under a database directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    /// * `create_if_missing` - If true, creates `wal/` and `wal/archive/`
    ///
    /// # Errors
    ///
    /// Returns an error if the directories are missing and
    /// `create_if_missing` is false, or if creation fails.
    pub fn open(path: &Path, create_if_missing: bool) -> WalResult<Self> {
        let dir = Self {
            path: path.to_path_buf(),
        };

        if create_if_missing {
            fs::create_dir_all(dir.archive_dir())
                .map_err(|e| WalError::io_at(dir.archive_dir().display().to_string(), e.to_string()))?;
        } else if !dir.wal_dir().is_dir() {
            return Err(WalError::io_at(
                dir.wal_dir().display().to_string(),
                "WAL directory does not exist",
            ));
        }

        Ok(dir)
    }

    /// Returns the database directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the live log directory.
    #[must_use]
    pub fn wal_dir(&self) -> PathBuf {
        self.path.join(WAL_DIR)
    }

    /// Returns the archive directory.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.wal_dir().join(ARCHIVE_DIR)
    }

    /// Returns the live path of log file `log_number`.
    #[must_use]
    pub fn live_log_path(&self, log_number: u64) -> PathBuf {
        self.wal_dir().join(log_file_name(log_number))
    }

    /// Returns the archived path of log file `log_number`.
    #[must_use]
    pub fn archived_log_path(&self, log_number: u64) -> PathBuf {
        self.archive_dir().join(log_file_name(log_number))
    }

    /// Moves a live log into the archive directory.
    ///
    /// Used by the rotation side of the engine; iterators only ever read.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    pub fn archive_log(&self, log_number: u64) -> WalResult<()> {
        let from = self.live_log_path(log_number);
        let to = self.archived_log_path(log_number);
        fs::rename(&from, &to)
            .map_err(|e| WalError::io_at(from.display().to_string(), e.to_string()))?;
        Ok(())
    }
}

/// File name of log `log_number`, e.g. `wal-000007.log`.
fn log_file_name(log_number: u64) -> String {
    format!("wal-{log_number:06}.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_layout() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("db");

        let dir = WalDir::open(&db_path, true).unwrap();
        assert!(dir.wal_dir().is_dir());
        assert!(dir.archive_dir().is_dir());
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("nonexistent");

        let result = WalDir::open(&db_path, false);
        assert!(result.is_err());
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        assert_eq!(
            dir.live_log_path(7),
            temp.path().join("wal").join("wal-000007.log")
        );
        assert_eq!(
            dir.archived_log_path(7),
            temp.path().join("wal").join("archive").join("wal-000007.log")
        );
    }

    #[test]
    fn archive_log_moves_file() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        let live = dir.live_log_path(3);
        fs::write(&live, b"log bytes").unwrap();

        dir.archive_log(3).unwrap();

        assert!(!live.exists());
        let archived = dir.archived_log_path(3);
        assert_eq!(fs::read(&archived).unwrap(), b"log bytes");
    }

    #[test]
    fn archive_missing_log_fails() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        assert!(dir.archive_log(99).is_err());
    }
}
