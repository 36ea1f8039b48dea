//! Streaming per-file frame reader.
//!
//! Reads framed records one-by-one from a storage backend, keeping memory
//! bounded by the largest single frame.
//!
//! # Recovery Policy
//!
//! The reader distinguishes between **tolerated** conditions (crash
//! mid-append) and **reported** conditions (corruption):
//!
//! ## Tolerated (returns `None`, sets the EOF flag)
//!
//! - Truncated header: fewer than 10 bytes remain at end of file
//! - Truncated frame: frame length exceeds available bytes
//!
//! These represent incomplete appends that were interrupted before fsync.
//! The partial frame stays in place; once the writer completes it and the
//! EOF flag is cleared, the same offset yields the full frame.
//!
//! ## Reported (skipped, reading continues)
//!
//! - Invalid magic or unsupported version: the dropped span is reported and
//!   the reader resynchronizes on the next magic
//! - CRC mismatch: the frame is reported and skipped
//!
//! A transaction-log iterator has to survive damaged spans in the middle of
//! a log, so corruption here is reported to the [`CorruptionReporter`]
//! rather than raised as an error; the iterator decides what is fatal.

use crate::error::WalError;
use crate::wal::record::{compute_crc32, CRC_SIZE, FRAME_HEADER_SIZE, FRAME_MAGIC, FRAME_VERSION};
use crate::wal::reporter::CorruptionReporter;
use quilldb_storage::StorageBackend;
use std::sync::Arc;

/// Chunk size used when scanning for the next valid frame magic.
const RESYNC_CHUNK_SIZE: usize = 4096;

/// A streaming reader over the frames of a single log file.
pub struct FrameReader {
    /// Backend holding the file contents.
    backend: Box<dyn StorageBackend>,
    /// Sink for corruption reports.
    reporter: Arc<dyn CorruptionReporter>,
    /// Whether to verify frame checksums.
    verify_checksums: bool,
    /// Log number of the file, for report messages.
    log_number: u64,
    /// Current read position.
    offset: u64,
    /// Set when a read attempt ran out of bytes.
    eof: bool,
}

impl FrameReader {
    /// Creates a reader positioned at the start of the file.
    pub fn new(
        backend: Box<dyn StorageBackend>,
        reporter: Arc<dyn CorruptionReporter>,
        verify_checksums: bool,
        log_number: u64,
    ) -> Self {
        Self {
            backend,
            reporter,
            verify_checksums,
            log_number,
            offset: 0,
            eof: false,
        }
    }

    /// Reads the next frame payload.
    ///
    /// Returns `None` at end of file, after a torn tail, or while the EOF
    /// flag is set. Corrupt frames are reported and skipped.
    pub fn read_record(&mut self) -> Option<Vec<u8>> {
        if self.eof {
            return None;
        }

        loop {
            let size = match self.backend.size() {
                Ok(size) => size,
                Err(e) => {
                    self.reporter.corruption(0, &WalError::from(e));
                    self.eof = true;
                    return None;
                }
            };

            // Truncated header at the tail: not enough bytes for a frame
            // header. Tolerated, the writer may still be appending.
            if self.offset + FRAME_HEADER_SIZE as u64 > size {
                self.eof = true;
                return None;
            }

            let header = match self.read_exact(self.offset, FRAME_HEADER_SIZE) {
                Some(header) => header,
                None => return None,
            };

            if header[0..4] != FRAME_MAGIC {
                self.resync(size, "invalid frame magic");
                if self.eof {
                    return None;
                }
                continue;
            }

            let version = u16::from_le_bytes([header[4], header[5]]);
            if version > FRAME_VERSION {
                self.resync(size, "unsupported frame version");
                if self.eof {
                    return None;
                }
                continue;
            }

            let payload_len =
                u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
            let total_len = FRAME_HEADER_SIZE + payload_len + CRC_SIZE;

            // Truncated frame at the tail. Also tolerated.
            if self.offset + total_len as u64 > size {
                self.eof = true;
                return None;
            }

            let frame = match self.read_exact(self.offset, total_len) {
                Some(frame) => frame,
                None => return None,
            };

            if self.verify_checksums {
                let crc_offset = total_len - CRC_SIZE;
                let stored = u32::from_le_bytes(
                    frame[crc_offset..].try_into().unwrap_or([0; CRC_SIZE]),
                );
                let computed = compute_crc32(&frame[..crc_offset]);
                if stored != computed {
                    self.reporter.corruption(
                        total_len,
                        &WalError::corruption(format!(
                            "frame checksum mismatch in log {}",
                            self.log_number
                        )),
                    );
                    self.offset += total_len as u64;
                    continue;
                }
            }

            self.offset += total_len as u64;
            return Some(frame[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + payload_len].to_vec());
        }
    }

    /// Returns true if the reader has encountered an EOF condition.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Clears the EOF condition so reading can resume.
    ///
    /// The file size is re-examined on the next read, so bytes appended
    /// since the EOF was hit become visible without reopening.
    pub fn clear_eof(&mut self) {
        self.eof = false;
    }

    /// Log number of the file this reader consumes.
    #[must_use]
    pub fn log_number(&self) -> u64 {
        self.log_number
    }

    fn read_exact(&mut self, offset: u64, len: usize) -> Option<Vec<u8>> {
        match self.backend.read_at(offset, len) {
            Ok(data) => Some(data),
            Err(e) => {
                self.reporter.corruption(len, &WalError::from(e));
                self.eof = true;
                None
            }
        }
    }

    /// Skips forward to the next occurrence of the frame magic, reporting
    /// the dropped span. Sets EOF if no further magic exists.
    fn resync(&mut self, size: u64, reason: &str) {
        let damaged_at = self.offset;
        let mut search = self.offset + 1;

        while search + FRAME_MAGIC.len() as u64 <= size {
            let chunk_len = (size - search).min(RESYNC_CHUNK_SIZE as u64) as usize;
            let chunk = match self.backend.read_at(search, chunk_len) {
                Ok(chunk) => chunk,
                Err(_) => break,
            };
            if let Some(pos) = chunk.windows(FRAME_MAGIC.len()).position(|w| w == FRAME_MAGIC) {
                let found = search + pos as u64;
                self.report_drop(damaged_at, found, reason);
                self.offset = found;
                return;
            }
            if chunk_len <= FRAME_MAGIC.len() - 1 {
                break;
            }
            // Overlap so a magic straddling a chunk boundary is not missed.
            search += (chunk_len - (FRAME_MAGIC.len() - 1)) as u64;
        }

        self.report_drop(damaged_at, size, reason);
        self.offset = size;
        self.eof = true;
    }

    fn report_drop(&self, from: u64, to: u64, reason: &str) {
        self.reporter.corruption(
            (to - from) as usize,
            &WalError::corruption(format!(
                "{reason} at offset {from} in log {}",
                self.log_number
            )),
        );
    }
}

impl std::fmt::Debug for FrameReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("log_number", &self.log_number)
            .field("offset", &self.offset)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}
