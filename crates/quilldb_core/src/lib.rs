//! # QuillDB Core
//!
//! The write-ahead-log slice of the QuillDB storage engine.
//!
//! This crate provides:
//! - The WAL frame format and opaque [`wal::WriteBatch`] payloads
//! - A streaming per-file frame reader with corruption reporting
//! - A log writer for producing WAL files
//! - The live/archive WAL directory layout
//! - [`wal::TransactionLogIterator`]: replay of committed write-batches in
//!   strict sequence order across rolling log files

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dir;
pub mod error;
pub mod types;
pub mod version;
pub mod wal;

pub use config::ReadOptions;
pub use dir::WalDir;
pub use error::{WalError, WalResult};
pub use types::SequenceNumber;
pub use version::{VersionSet, VersionView};
