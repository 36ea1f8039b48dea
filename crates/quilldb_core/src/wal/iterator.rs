//! Transaction-log iterator.
//!
//! Replays committed write-batches from a set of WAL files in strict
//! sequence-number order, starting from a caller-specified sequence number
//! and continuing up to the committed horizon of a [`VersionView`].
//!
//! # States
//!
//! - **Unstarted**: the iterator has not yet positioned at or past its
//!   starting sequence. `valid()` is false; `next()` retries the seek.
//! - **Positioned**: `valid()` is true and [`TransactionLogIterator::take_batch`]
//!   may be called. Delivered batches are contiguous: each starts exactly one
//!   past the previous batch's last sequence.
//! - **Exhausted**: every batch up to `last_sequence()` was delivered.
//!   `valid()` is false and `status()` is `Ok`. A later `next()` keeps
//!   reading, so a caller can tail a live log as the horizon advances.
//! - **Faulted**: a fatal condition was latched (open failure after archive
//!   fallback, an unreconcilable sequence gap, or log files that end below
//!   the committed horizon). `valid()` is false, `status()` returns the same
//!   error on every poll, and `next()` is a no-op.
//!
//! # Gap handling
//!
//! Once the iterator has started, every decoded batch must begin exactly one
//! past the previous batch. A discontinuity triggers an automatic reseek: the
//! iterator picks the file whose range should contain the expected sequence
//! and runs a *strict* seek, which must land exactly on it. A strict seek
//! that lands anywhere else latches a gap corruption and faults the
//! iterator. The gap check lives here in the advance driver; a seek never
//! performs it (the `started` flag is false for the whole scan), so the
//! seek/advance pair cannot recurse into each other.
//!
//! # Restricted reads
//!
//! A record read is only attempted while the last delivered sequence is
//! below `last_sequence()`. Bytes past the horizon may be a torn tail the
//! writer has not made durable; they must never surface.

use crate::config::ReadOptions;
use crate::dir::WalDir;
use crate::error::{WalError, WalResult};
use crate::types::SequenceNumber;
use crate::version::VersionView;
use crate::wal::files::{open_log_file, LogFileDescriptor};
use crate::wal::reader::FrameReader;
use crate::wal::record::{WriteBatch, BATCH_HEADER_SIZE};
use crate::wal::reporter::{CorruptionReporter, TracingReporter};
use std::sync::Arc;

const SEEK_GAP_MESSAGE: &str =
    "Gap in sequence number. Could not seek to required sequence number";
const SKIP_TO_NEXT_MESSAGE: &str =
    "Start sequence was not found, skipping to the next available";
const NO_MORE_DATA_MESSAGE: &str = "NO MORE DATA LEFT";
const SEQUENCE_GAP_MESSAGE: &str = "Gap in sequence numbers";

/// Forward cursor over committed write-batches.
pub trait LogIterator {
    /// True when a batch is positioned and may be taken.
    fn valid(&self) -> bool;

    /// Advances to the next batch. Call `valid()` afterwards.
    fn next(&mut self);

    /// Current status: `Ok` while operating or cleanly exhausted, the
    /// latched error otherwise.
    fn status(&self) -> WalResult<()>;

    /// Moves the current batch out.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not `valid()`, or if the batch was already
    /// taken without an intervening `next()`.
    fn take_batch(&mut self) -> BatchResult;
}

/// A delivered batch and the sequence number it starts at.
#[derive(Debug)]
pub struct BatchResult {
    /// Sequence number of the first write in the batch.
    pub sequence: SequenceNumber,
    /// The batch payload.
    pub batch: WriteBatch,
}

/// Iterator over the transaction log of a WAL directory.
///
/// Constructed with a pre-filtered, ordered list of candidate log files
/// (the engine arranges for the target sequence to lie within the first
/// file when possible). Owns at most one open file at a time and performs
/// all I/O inline on the calling thread.
pub struct TransactionLogIterator {
    dir: WalDir,
    read_options: ReadOptions,
    /// Target sequence; advanced when a reseek retargets the cursor.
    starting_sequence: u64,
    files: Vec<LogFileDescriptor>,
    versions: Arc<dyn VersionView>,
    reporter: Arc<dyn CorruptionReporter>,
    /// Sticky: set once the iterator has positioned at or past the starting
    /// sequence. Arms gap detection.
    started: bool,
    /// Per-batch: true while `current_batch` may be taken.
    valid: bool,
    /// Set when a fatal status is latched; the iterator will not recover.
    faulted: bool,
    current_file_index: usize,
    reader: Option<FrameReader>,
    current_batch: Option<WriteBatch>,
    /// `None` is OK; `Some` is the latched status.
    current_status: Option<WalError>,
    /// Sequence number at the start of the current batch.
    current_batch_seq: u64,
    /// Last sequence number in the current batch.
    current_last_seq: u64,
}

impl TransactionLogIterator {
    /// Creates an iterator and seeks it to `starting_sequence`.
    ///
    /// Construction does not fail: any error is latched and observable
    /// through `status()`, with `valid()` false.
    #[must_use]
    pub fn new(
        dir: WalDir,
        read_options: ReadOptions,
        starting_sequence: SequenceNumber,
        files: Vec<LogFileDescriptor>,
        versions: Arc<dyn VersionView>,
    ) -> Self {
        Self::with_reporter(
            dir,
            read_options,
            starting_sequence,
            files,
            versions,
            Arc::new(TracingReporter),
        )
    }

    /// Like [`Self::new`] with a custom report sink.
    #[must_use]
    pub fn with_reporter(
        dir: WalDir,
        read_options: ReadOptions,
        starting_sequence: SequenceNumber,
        files: Vec<LogFileDescriptor>,
        versions: Arc<dyn VersionView>,
        reporter: Arc<dyn CorruptionReporter>,
    ) -> Self {
        let mut iter = Self {
            dir,
            read_options,
            starting_sequence: starting_sequence.as_u64(),
            files,
            versions,
            reporter,
            started: false,
            valid: false,
            faulted: false,
            current_file_index: 0,
            reader: None,
            current_batch: None,
            current_status: None,
            current_batch_seq: 0,
            current_last_seq: 0,
        };
        iter.seek_to_start(0, false);
        iter
    }

    fn last_committed(&self) -> u64 {
        self.versions.last_sequence().as_u64()
    }

    /// Reads the next record, but only while the cursor is below the
    /// committed horizon.
    fn restricted_read(&mut self) -> Option<Vec<u8>> {
        if self.current_last_seq >= self.last_committed() {
            return None;
        }
        self.reader.as_mut()?.read_record()
    }

    /// Opens the reader for `files[index]`, falling back to the archive
    /// directory per the opening policy.
    fn open_log_reader(&mut self, index: usize) -> WalResult<()> {
        let file = &self.files[index];
        let backend = open_log_file(&self.dir, file)?;
        self.reader = Some(FrameReader::new(
            Box::new(backend),
            Arc::clone(&self.reporter),
            self.read_options.verify_checksums,
            file.log_number(),
        ));
        self.current_file_index = index;
        Ok(())
    }

    /// Validates a raw record into a batch, reporting and discarding
    /// records that cannot carry one.
    fn decode_record(&self, record: Vec<u8>) -> Option<WriteBatch> {
        if record.len() < BATCH_HEADER_SIZE {
            self.reporter
                .corruption(record.len(), &WalError::corruption("very small log record"));
            return None;
        }
        let batch = WriteBatch::from_payload(record);
        if batch.count() == 0 {
            // A zero-count batch would move the cursor backwards.
            self.reporter.corruption(
                batch.byte_size(),
                &WalError::corruption("write batch with zero count"),
            );
            return None;
        }
        Some(batch)
    }

    /// Accepts `batch` as the current position of the cursor.
    ///
    /// This is the only place the status resets from an error back to OK.
    fn accept_batch(&mut self, batch: WriteBatch) {
        self.current_batch_seq = batch.start_sequence().as_u64();
        self.current_last_seq = self.current_batch_seq + u64::from(batch.count()) - 1;
        // A batch past the horizon slipping through the restricted read
        // would be an engine-wide accounting bug, not I/O corruption.
        debug_assert!(
            self.current_last_seq <= self.last_committed(),
            "accepted batch ends at {} past committed horizon {}",
            self.current_last_seq,
            self.last_committed()
        );
        self.current_batch = Some(batch);
        self.valid = true;
        self.current_status = None;
    }

    /// Index of the file whose range should contain `expected`: the last
    /// file starting at or below it. Relies on start sequences being
    /// non-decreasing across the list.
    fn reseek_file_index(&self, expected: u64) -> usize {
        let past = self
            .files
            .partition_point(|f| f.start_sequence().as_u64() <= expected);
        past.saturating_sub(1)
    }

    /// Seeks to `starting_sequence`, scanning forward from
    /// `files[start_file_index]`.
    ///
    /// With `strict` set the first batch at or past the target must begin
    /// exactly at it; anything else latches a gap corruption. Non-strict
    /// seeks accept the first batch whose range reaches the target.
    fn seek_to_start(&mut self, start_file_index: usize, strict: bool) {
        self.started = false;
        self.valid = false;
        if self.files.len() <= start_file_index {
            return;
        }

        if let Err(e) = self.open_log_reader(start_file_index) {
            self.reporter.info(&e.to_string());
            self.current_status = Some(e);
            self.faulted = true;
            return;
        }

        while let Some(record) = self.restricted_read() {
            let Some(batch) = self.decode_record(record) else {
                continue;
            };
            self.accept_batch(batch);

            if self.current_last_seq >= self.starting_sequence {
                if strict && self.current_batch_seq != self.starting_sequence {
                    let err = WalError::corruption(SEEK_GAP_MESSAGE);
                    self.reporter.info(&err.to_string());
                    self.current_status = Some(err);
                    self.faulted = true;
                    self.valid = false;
                    return;
                } else if strict {
                    self.reporter
                        .info("Could seek required sequence number. Iterator will continue.");
                }
                self.valid = true;
                self.started = true;
                return;
            }
            self.valid = false;
        }

        // The target was not reached in the scanned file.
        if strict {
            // A reseek knows which file must hold the expected batch; not
            // finding it there is unreconcilable.
            let err = WalError::corruption(SEEK_GAP_MESSAGE);
            self.reporter.info(&err.to_string());
            self.current_status = Some(err);
            self.faulted = true;
        } else if self.files.len() != 1 {
            // Let the forward scan position at the next available batch.
            // `started` stays false so no gap is flagged while skipping.
            let err = WalError::corruption(SKIP_TO_NEXT_MESSAGE);
            self.reporter.info(&err.to_string());
            self.current_status = Some(err);
            self.advance(true);
        }
        // Single file, non-strict: no data for this seek yet. The caller
        // observes invalid with an OK status and may retry later.
    }

    /// Advances one batch. `internal` marks the recovery path out of a
    /// non-strict seek miss, where the next available batch is accepted
    /// without a continuity check.
    fn advance(&mut self, internal: bool) {
        self.valid = false;
        if !internal && !self.started {
            // Runs on every `next()` until the seek lands.
            return self.seek_to_start(0, false);
        }

        loop {
            debug_assert!(self.reader.is_some());
            if let Some(reader) = self.reader.as_mut() {
                if reader.is_eof() {
                    // Pick up bytes appended since the EOF was hit.
                    reader.clear_eof();
                }
            }

            while let Some(record) = self.restricted_read() {
                let Some(batch) = self.decode_record(record) else {
                    continue;
                };

                let expected = self.current_last_seq + 1;
                let batch_seq = batch.start_sequence().as_u64();
                if self.started && batch_seq != expected {
                    self.reporter.info(&format!(
                        "Discontinuity in log records. Got seq={batch_seq}, Expected seq={expected}, \
                         Last flushed seq={}. Log iterator will reseek the correct batch.",
                        self.last_committed()
                    ));
                    let reseek_index = self.reseek_file_index(expected);
                    self.starting_sequence = expected;
                    // Replaced by OK if the strict seek lands on the batch.
                    self.current_status = Some(WalError::not_found(SEQUENCE_GAP_MESSAGE));
                    return self.seek_to_start(reseek_index, true);
                }

                self.accept_batch(batch);
                if internal && !self.started {
                    self.started = true;
                }
                return;
            }

            // Current file is drained; roll to the next one or finish.
            if self.current_file_index + 1 < self.files.len() {
                let next_index = self.current_file_index + 1;
                if let Err(e) = self.open_log_reader(next_index) {
                    self.valid = false;
                    self.current_status = Some(e);
                    self.faulted = true;
                    return;
                }
            } else {
                self.valid = false;
                if self.current_last_seq == self.last_committed() {
                    // Caught up with the writer.
                    self.current_status = None;
                } else {
                    // The writer claims higher sequences than our logs hold.
                    self.current_status = Some(WalError::corruption(NO_MORE_DATA_MESSAGE));
                    self.faulted = true;
                }
                return;
            }
        }
    }
}

impl LogIterator for TransactionLogIterator {
    fn valid(&self) -> bool {
        self.started && self.valid
    }

    fn next(&mut self) {
        if self.faulted {
            return;
        }
        self.advance(false);
    }

    fn status(&self) -> WalResult<()> {
        match &self.current_status {
            None => Ok(()),
            Some(e) => Err(e.clone()),
        }
    }

    fn take_batch(&mut self) -> BatchResult {
        assert!(self.valid(), "take_batch called on an invalid iterator");
        let batch = self
            .current_batch
            .take()
            .expect("batch already taken; call next() before take_batch() again");
        BatchResult {
            sequence: SequenceNumber::new(self.current_batch_seq),
            batch,
        }
    }
}

impl std::fmt::Debug for TransactionLogIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLogIterator")
            .field("starting_sequence", &self.starting_sequence)
            .field("current_file_index", &self.current_file_index)
            .field("started", &self.started)
            .field("valid", &self.valid)
            .field("faulted", &self.faulted)
            .field("current_batch_seq", &self.current_batch_seq)
            .field("current_last_seq", &self.current_last_seq)
            .finish_non_exhaustive()
    }
}
