//! Client-facing record buffer
//!
//! A `JournalBuffer` is one contiguous allocation holding the record
//! header region followed by the payload region. Before a write, the
//! header (payload length + checksum) is prepared in place, so the
//! whole framed record is handed to the batch as a single slice with
//! no extra copy. The same buffer serves as the destination for reads.

use crate::checksum::compute_checksum;
use crate::error::{JournalError, JournalResult};
use crate::header::{RecordHeader, RECORD_HEADER_LEN};

/// Reusable buffer framing a payload with its record header.
#[derive(Debug)]
pub struct JournalBuffer {
    /// Header region + payload region, one allocation
    bytes: Vec<u8>,
    /// Bytes of payload currently held
    payload_len: usize,
}

impl JournalBuffer {
    /// Allocates a buffer able to hold a payload of up to `capacity` bytes.
    pub fn with_payload_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; RECORD_HEADER_LEN + capacity],
            payload_len: 0,
        }
    }

    /// Maximum payload size this buffer can hold.
    pub fn payload_capacity(&self) -> usize {
        self.bytes.len() - RECORD_HEADER_LEN
    }

    /// Bytes of payload currently held.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// View of the payload currently held.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[RECORD_HEADER_LEN..RECORD_HEADER_LEN + self.payload_len]
    }

    /// Replaces the payload with a copy of `src`.
    ///
    /// Fails with `NotEnoughSpaceInBuffer` when `src` exceeds the
    /// payload capacity.
    pub fn put_payload(&mut self, src: &[u8]) -> JournalResult<()> {
        if src.len() > self.payload_capacity() {
            return Err(JournalError::NotEnoughSpaceInBuffer {
                required: src.len(),
                available: self.payload_capacity(),
            });
        }
        self.bytes[RECORD_HEADER_LEN..RECORD_HEADER_LEN + src.len()].copy_from_slice(src);
        self.payload_len = src.len();
        Ok(())
    }

    /// Discards the payload, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.payload_len = 0;
    }

    /// Prepares the record header in place and returns the framed
    /// record (header + payload) ready to append to a batch.
    ///
    /// Fails with `EmptyPayload` when no payload bytes are held:
    /// zero-length records are rejected at write time.
    pub(crate) fn frame(&mut self) -> JournalResult<&[u8]> {
        if self.payload_len == 0 {
            return Err(JournalError::EmptyPayload);
        }
        let checksum = compute_checksum(
            &self.bytes[RECORD_HEADER_LEN..RECORD_HEADER_LEN + self.payload_len],
        );
        let header = RecordHeader::new(self.payload_len as u32, checksum)?;
        header.encode_into(&mut self.bytes);
        Ok(&self.bytes[..RECORD_HEADER_LEN + self.payload_len])
    }

    /// Full payload region, for the read channel to fill.
    pub(crate) fn payload_region_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[RECORD_HEADER_LEN..]
    }

    /// Marks `len` payload bytes as filled by a read.
    pub(crate) fn set_payload_len(&mut self, len: usize) {
        debug_assert!(len <= self.payload_capacity());
        self.payload_len = len;
    }
}
