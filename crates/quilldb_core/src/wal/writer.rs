//! WAL writer.

use crate::error::WalResult;
use crate::wal::record::{encode_frame, WriteBatch};
use parking_lot::Mutex;
use quilldb_storage::StorageBackend;
use std::sync::Arc;

/// Appends framed write-batches to a single log file.
///
/// The writer owns its backend behind a mutex so the engine can append from
/// multiple call sites; log rotation replaces the whole writer.
pub struct LogWriter {
    /// Storage backend for log data.
    backend: Arc<Mutex<Box<dyn StorageBackend>>>,
    /// Whether to sync after each append.
    sync_on_write: bool,
}

impl LogWriter {
    /// Creates a new log writer.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            sync_on_write,
        }
    }

    /// Appends a batch to the log.
    ///
    /// Returns the offset where the frame was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or the post-write sync fails.
    pub fn append(&self, batch: &WriteBatch) -> WalResult<u64> {
        let data = encode_frame(batch.data());

        let mut backend = self.backend.lock();
        let offset = backend.append(&data)?;

        if self.sync_on_write {
            backend.sync()?;
        }

        Ok(offset)
    }

    /// Flushes all pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> WalResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> WalResult<()> {
        self.backend.lock().sync()?;
        Ok(())
    }

    /// Returns the current log size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> WalResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SequenceNumber;
    use crate::wal::reader::FrameReader;
    use crate::wal::reporter::TracingReporter;
    use quilldb_storage::InMemoryBackend;

    fn batch(seq: u64, ops: &[&[u8]]) -> WriteBatch {
        let mut batch = WriteBatch::new(SequenceNumber::new(seq));
        for op in ops {
            batch.push(op);
        }
        batch
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let writer = LogWriter::new(Box::new(InMemoryBackend::new()), false);

        let o1 = writer.append(&batch(1, &[b"a"])).unwrap();
        let o2 = writer.append(&batch(2, &[b"b"])).unwrap();

        assert_eq!(o1, 0);
        assert!(o2 > o1);
        assert!(writer.size().unwrap() > o2);
    }

    #[test]
    fn written_batches_read_back() {
        let backend = InMemoryBackend::new();
        let writer = LogWriter::new(Box::new(backend.clone()), true);

        let b1 = batch(1, &[b"put x"]);
        let b2 = batch(2, &[b"put y", b"del z"]);
        writer.append(&b1).unwrap();
        writer.append(&b2).unwrap();

        let mut reader =
            FrameReader::new(Box::new(backend), Arc::new(TracingReporter), true, 1);

        assert_eq!(reader.read_record(), Some(b1.data().to_vec()));
        assert_eq!(reader.read_record(), Some(b2.data().to_vec()));
        assert_eq!(reader.read_record(), None);
    }

    #[test]
    fn empty_log_has_zero_size() {
        let writer = LogWriter::new(Box::new(InMemoryBackend::new()), false);
        assert_eq!(writer.size().unwrap(), 0);
    }
}
