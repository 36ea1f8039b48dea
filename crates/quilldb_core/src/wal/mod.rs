//! Write-ahead log: frame format, files, and the transaction-log iterator.
//!
//! Every committed write-batch is appended to the current live log as one
//! framed record. Rotated-out logs move into the archive directory, where
//! iterators can still reach them.
//!
//! ## Frame Format
//!
//! ```text
//! | magic (4) | version (2) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is an opaque write-batch with a fixed header:
//!
//! ```text
//! | start_sequence (8) | count (4) | ops... |
//! ```
//!
//! A batch occupies the contiguous sequence range
//! `[start_sequence, start_sequence + count - 1]`.
//!
//! ## Replay
//!
//! [`TransactionLogIterator`] replays batches in strict sequence order from
//! a caller-chosen starting sequence up to the committed horizon of a
//! [`crate::version::VersionView`]:
//!
//! ```ignore
//! let mut iter = TransactionLogIterator::new(dir, opts, seq, files, versions);
//! while iter.valid() {
//!     let update = iter.take_batch();
//!     // apply update.batch ...
//!     iter.next();
//! }
//! iter.status()?; // Ok(()) == cleanly caught up with the writer
//! ```
//!
//! ## Invariants
//!
//! - Logs are **append-only**; frames are never modified after write
//! - Delivered batches are **contiguous**: each starts one past the
//!   previous batch's last sequence
//! - No delivered batch ever ends **past the committed horizon**, which is
//!   what keeps torn tail writes invisible
//! - Frame-level corruption is **reported and skipped**; only conditions
//!   the iterator cannot reconcile latch a fatal status

mod files;
mod iterator;
mod reader;
mod record;
mod reporter;
mod writer;

pub use files::{open_log_file, LogFileDescriptor, LogFileKind};
pub use iterator::{BatchResult, LogIterator, TransactionLogIterator};
pub use reader::FrameReader;
pub use record::{
    compute_crc32, encode_frame, WriteBatch, BATCH_HEADER_SIZE, CRC_SIZE, FRAME_HEADER_SIZE,
    FRAME_MAGIC, FRAME_VERSION,
};
pub use reporter::{CorruptionReporter, TracingReporter};
pub use writer::LogWriter;
