//! Committed-sequence tracking.

use crate::types::SequenceNumber;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only view of the engine's committed sequence horizon.
///
/// The transaction-log iterator consults this on every read to avoid
/// surfacing batches the writer has not yet made durable. Implementations
/// must return a value that is monotonically non-decreasing over the
/// lifetime of any iterator holding the view; a shrinking horizon would be
/// indistinguishable from log corruption.
pub trait VersionView: Send + Sync {
    /// Returns the last committed (durable) sequence number.
    fn last_sequence(&self) -> SequenceNumber;
}

/// The engine's live sequence tracker.
///
/// The write path advances this after each batch becomes durable; readers
/// observe it through [`VersionView`].
#[derive(Debug, Default)]
pub struct VersionSet {
    last_sequence: AtomicU64,
}

impl VersionSet {
    /// Creates a tracker with the given committed horizon.
    #[must_use]
    pub fn new(last_sequence: SequenceNumber) -> Self {
        Self {
            last_sequence: AtomicU64::new(last_sequence.as_u64()),
        }
    }

    /// Advances the committed horizon to `seq`.
    ///
    /// Uses `fetch_max`, so the horizon never moves backwards even when
    /// writers race.
    pub fn advance_to(&self, seq: SequenceNumber) {
        self.last_sequence
            .fetch_max(seq.as_u64(), Ordering::Release);
    }
}

impl VersionView for VersionSet {
    fn last_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.last_sequence.load(Ordering::Acquire))
    }
}
