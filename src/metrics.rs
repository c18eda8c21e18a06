//! Operational counters for a journal
//!
//! Counters only: monotonic, reset on process start, thread-safe via
//! Relaxed atomics (eventual consistency is fine for metrics).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counter registry shared by the write and read paths of a journal.
#[derive(Debug, Default)]
pub struct JournalMetrics {
    /// Records accepted by the write path
    records_written: AtomicU64,
    /// Batches drained to the file
    batches_flushed: AtomicU64,
    /// Bytes drained to the file, headers included
    bytes_flushed: AtomicU64,
    /// Records read back and verified
    records_read: AtomicU64,
    /// Reads rejected with a checksum mismatch
    checksum_failures: AtomicU64,
}

impl JournalMetrics {
    /// Create a new registry with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_records_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_batches_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_flushed(&self, bytes: u64) {
        self.bytes_flushed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn increment_records_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_checksum_failures(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn bytes_flushed(&self) -> u64 {
        self.bytes_flushed.load(Ordering::Relaxed)
    }

    pub fn records_read(&self) -> u64 {
        self.records_read.load(Ordering::Relaxed)
    }

    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter, for export or logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_written: self.records_written(),
            batches_flushed: self.batches_flushed(),
            bytes_flushed: self.bytes_flushed(),
            records_read: self.records_read(),
            checksum_failures: self.checksum_failures(),
        }
    }
}

/// Serializable snapshot of [`JournalMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_written: u64,
    pub batches_flushed: u64,
    pub bytes_flushed: u64,
    pub records_read: u64,
    pub checksum_failures: u64,
}
