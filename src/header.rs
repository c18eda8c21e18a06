//! On-disk header layouts
//!
//! Both headers are fixed-width, big-endian, and (de)serialized with
//! explicit offset math over byte slices, no live aliased views.
//!
//! Journal file layout (schema v1):
//!
//! ```text
//! [0..4)   journal magic (u32)
//! [4..8)   schema version (u32)
//! repeated records:
//!   [0..4)   record magic (u32)
//!   [4..8)   payload length in bytes (u32, > 0)
//!   [8..16)  payload checksum (u64)
//!   [16..16+length) payload bytes
//! ```

use crate::error::{JournalError, JournalResult};

/// Magic prefix at offset 0 of every journal file
pub const JOURNAL_MAGIC: u32 = 0xCAFE_BABE;

/// Schema version tag for the v1 layout
pub const SCHEMA_VERSION_V1: u32 = 0x0FF1_CE01;

/// Closed set of schema versions this build can open
pub const SUPPORTED_SCHEMA_VERSIONS: [u32; 1] = [SCHEMA_VERSION_V1];

/// Journal header length in bytes: magic + schema version
pub const JOURNAL_HEADER_LEN: usize = 8;

/// Magic prefix of every record header
pub const RECORD_MAGIC: u32 = 0xF0CA_CC1A;

/// Record header length in bytes: magic + payload length + checksum
pub const RECORD_HEADER_LEN: usize = 16;

/// Journal file header, written exactly once at creation/truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// Schema version of the file
    pub schema_version: u32,
}

impl JournalHeader {
    /// Header for a freshly created journal file.
    pub fn current() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1,
        }
    }

    /// Serializes the header into its fixed 8-byte layout.
    pub fn encode(&self) -> [u8; JOURNAL_HEADER_LEN] {
        let mut buf = [0u8; JOURNAL_HEADER_LEN];
        buf[0..4].copy_from_slice(&JOURNAL_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&self.schema_version.to_be_bytes());
        buf
    }

    /// Parses and validates a journal header.
    ///
    /// Fails with `InvalidJournalHeader` on a magic mismatch and
    /// `UnsupportedJournalVersion` when the schema version is not in
    /// the supported set.
    pub fn decode(bytes: &[u8]) -> JournalResult<Self> {
        if bytes.len() < JOURNAL_HEADER_LEN {
            return Err(JournalError::TooSmallJournalHeader {
                size: bytes.len() as u64,
            });
        }
        let prefix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if prefix != JOURNAL_MAGIC {
            return Err(JournalError::InvalidJournalHeader {
                prefix,
                expected: JOURNAL_MAGIC,
            });
        }
        let schema_version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&schema_version) {
            return Err(JournalError::UnsupportedJournalVersion {
                version: schema_version,
            });
        }
        Ok(Self { schema_version })
    }
}

/// Record header, persisted immediately before each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Payload length in bytes, always positive
    pub payload_len: u32,
    /// Checksum of the payload bytes
    pub checksum: u64,
}

impl RecordHeader {
    /// Builds a header, rejecting zero-length payloads.
    pub fn new(payload_len: u32, checksum: u64) -> JournalResult<Self> {
        if payload_len == 0 {
            return Err(JournalError::InvalidRecordLength { length: 0 });
        }
        Ok(Self {
            payload_len,
            checksum,
        })
    }

    /// Serializes the header into the first 16 bytes of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= RECORD_HEADER_LEN);
        buf[0..4].copy_from_slice(&RECORD_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&self.payload_len.to_be_bytes());
        buf[8..16].copy_from_slice(&self.checksum.to_be_bytes());
    }

    /// Parses and validates a record header from `bytes`.
    ///
    /// A magic mismatch covers both corruption and a read at an offset
    /// that does not start a record.
    pub fn decode(bytes: &[u8]) -> JournalResult<Self> {
        debug_assert!(bytes.len() >= RECORD_HEADER_LEN);
        let prefix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if prefix != RECORD_MAGIC {
            return Err(JournalError::InvalidRecordHeader {
                prefix,
                expected: RECORD_MAGIC,
            });
        }
        let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if payload_len == 0 {
            return Err(JournalError::InvalidRecordLength { length: payload_len });
        }
        let checksum = u64::from_be_bytes([
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        ]);
        Ok(Self {
            payload_len,
            checksum,
        })
    }
}
