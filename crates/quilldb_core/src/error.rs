//! Error types for QuillDB core.

use quilldb_storage::StorageError;
use thiserror::Error;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors that can occur in WAL operations.
///
/// The transaction-log iterator latches one of these as its current status
/// and hands it back on every subsequent poll, so the type carries owned
/// message strings rather than live `io::Error` values and is `Clone`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalError {
    /// An I/O or storage failure, tagged with the path it occurred on.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path of the file involved.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// The log is corrupted or inconsistent with the committed horizon.
    #[error("log corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// A required entry was not present.
    ///
    /// Used as the transient marker while the iterator reseeks across a
    /// sequence-number gap; replaced by `Ok` when the reseek lands.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },
}

impl WalError {
    /// Creates an I/O error tagged with a path.
    pub fn io_at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Returns true for corruption errors.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}

impl From<StorageError> for WalError {
    fn from(e: StorageError) -> Self {
        Self::Corruption {
            message: format!("storage error: {e}"),
        }
    }
}
