//! Journal error types
//!
//! Errors fall into four groups:
//! - header errors, raised while opening a journal file
//! - record framing errors, raised per read call
//! - I/O errors, fatal to the channel that hit them
//! - shutdown errors, raised when the write path is no longer usable
//!
//! Corruption is never masked: a framing or checksum failure is surfaced
//! to the caller that triggered it, with no retry and no partial result.

use std::io;

use thiserror::Error;

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors produced by journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    /// Journal file is shorter than the journal header
    #[error("journal file too small to contain a header: {size} bytes")]
    TooSmallJournalHeader {
        /// Actual file size in bytes
        size: u64,
    },

    /// Journal header magic does not match
    #[error("invalid journal header prefix: [ {prefix:08x} ], expected [ {expected:08x} ]")]
    InvalidJournalHeader {
        /// Prefix found in the file
        prefix: u32,
        /// Expected journal magic
        expected: u32,
    },

    /// Journal schema version is not in the supported set
    #[error("unsupported journal schema version: [ {version:08x} ]")]
    UnsupportedJournalVersion {
        /// Version found in the file
        version: u32,
    },

    /// Record header magic does not match (corruption, or a read at an
    /// offset that does not start a record)
    #[error("invalid record header prefix: [ {prefix:08x} ], expected [ {expected:08x} ]")]
    InvalidRecordHeader {
        /// Prefix found at the read offset
        prefix: u32,
        /// Expected record magic
        expected: u32,
    },

    /// Record header declares a non-positive payload length
    #[error("record payload length must be greater than 0, got {length}")]
    InvalidRecordLength {
        /// Length found in the header
        length: u32,
    },

    /// Recomputed payload checksum does not match the stored one
    #[error("invalid record checksum: computed {computed:016x}, stored {stored:016x}")]
    InvalidRecordChecksum {
        /// Checksum recomputed over the bytes read
        computed: u64,
        /// Checksum stored in the record header
        stored: u64,
    },

    /// Destination buffer cannot hold the record payload
    #[error("not enough space in destination buffer: required {required}, available {available}")]
    NotEnoughSpaceInBuffer {
        /// Payload length declared by the record header
        required: usize,
        /// Remaining capacity of the destination buffer
        available: usize,
    },

    /// Payload contains no bytes to write
    #[error("buffer contains no data to write")]
    EmptyPayload,

    /// Framed record cannot fit into a batch of the configured size
    #[error("record of {size} bytes cannot fit in a batch of {capacity} bytes")]
    RecordTooLarge {
        /// Framed record size (header plus payload)
        size: usize,
        /// Batch capacity in bytes
        capacity: usize,
    },

    /// Fewer bytes were read than the record framing requires
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// File offset the read started at
        offset: u64,
        /// Bytes required
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Fewer bytes were written than the flushed batch contains.
    /// Fatal: a partial record write corrupts framing for all
    /// subsequent reads, so the flush thread stops and the journal
    /// becomes unusable.
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Bytes the batch contained
        expected: usize,
        /// Bytes actually written
        actual: usize,
    },

    /// Write attempted after `close`
    #[error("journal is closed")]
    Closed,

    /// The background flush thread failed; every blocked writer
    /// receives this instead of hanging
    #[error("journal flush thread failed: {0}")]
    FlushFailed(String),

    /// Underlying transport failure
    #[error("journal I/O error: {0}")]
    Io(#[from] io::Error),
}

impl JournalError {
    /// Returns true if this error leaves the journal unusable for writes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JournalError::ShortWrite { .. } | JournalError::FlushFailed(_) | JournalError::Closed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_errors_carry_context() {
        let err = JournalError::InvalidJournalHeader {
            prefix: 0xDEADBEEF,
            expected: crate::header::JOURNAL_MAGIC,
        };
        let display = format!("{}", err);
        assert!(display.contains("deadbeef"));
        assert!(display.contains("cafebabe"));
    }

    #[test]
    fn test_checksum_error_is_not_masked_as_io() {
        let err = JournalError::InvalidRecordChecksum {
            computed: 1,
            stored: 2,
        };
        assert!(!err.is_fatal());
        assert!(format!("{}", err).contains("checksum"));
    }

    #[test]
    fn test_short_write_is_fatal() {
        let err = JournalError::ShortWrite {
            expected: 64,
            actual: 12,
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk gone");
        let err: JournalError = io_err.into();
        assert!(matches!(err, JournalError::Io(_)));
    }
}
