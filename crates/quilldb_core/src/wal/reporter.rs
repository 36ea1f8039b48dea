//! Corruption reporting sink.

use crate::error::WalError;

/// Sink for read-path corruption reports and advisory messages.
///
/// The frame reader and the transaction-log iterator both report through
/// this channel. A report never terminates iteration by itself; only the
/// iterator's own logic promotes a condition into its latched status.
pub trait CorruptionReporter: Send + Sync {
    /// Some data was dropped. `bytes` is the approximate number of bytes
    /// lost to the condition.
    fn corruption(&self, bytes: usize, error: &WalError);

    /// Advisory message, e.g. a reseek notice.
    fn info(&self, message: &str);
}

/// Default reporter that forwards to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CorruptionReporter for TracingReporter {
    fn corruption(&self, bytes: usize, error: &WalError) {
        tracing::error!(bytes_dropped = bytes, %error, "dropping log bytes");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
}
