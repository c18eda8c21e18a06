//! Fixed-capacity staging batch
//!
//! Two long-lived batches are created when the write path opens and
//! are reused forever, never reallocated. Each cycles through
//! `empty -> filling -> full/flushing -> empty`. All mutation happens
//! under the `DoubleBatch` lock; the batch itself holds no
//! synchronization.

/// In-memory staging buffer accumulating framed records before one
/// disk flush.
#[derive(Debug)]
pub(crate) struct Batch {
    /// Fixed-capacity backing storage
    buf: Box<[u8]>,
    /// Current fill position
    len: usize,
    /// Incremented each time this batch is flushed. Waiters record the
    /// epoch at append time and sleep until it advances, which guards
    /// against both spurious wakeups and reuse of the batch across
    /// fill/flush cycles.
    flush_epoch: u64,
}

impl Batch {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            flush_epoch: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exact-full policy: the batch is full only when every byte of
    /// capacity is used.
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    pub(crate) fn has_remaining(&self, n: usize) -> bool {
        self.buf.len() - self.len >= n
    }

    /// Copies a framed record into the batch and advances the shared
    /// virtual position, returning the file offset assigned to the
    /// record. Never blocks; the caller has already verified capacity.
    pub(crate) fn append(&mut self, frame: &[u8], virtual_position: &mut u64) -> u64 {
        debug_assert!(self.has_remaining(frame.len()));
        let offset = *virtual_position;
        self.buf[self.len..self.len + frame.len()].copy_from_slice(frame);
        self.len += frame.len();
        *virtual_position += frame.len() as u64;
        offset
    }

    /// Read-view of the filled region, for flushing.
    pub(crate) fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub(crate) fn flush_epoch(&self) -> u64 {
        self.flush_epoch
    }

    /// Resets the fill position and marks the flush complete.
    pub(crate) fn mark_flushed(&mut self) {
        self.len = 0;
        self.flush_epoch += 1;
    }
}
