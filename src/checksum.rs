//! CRC32 checksum computation for record payloads
//!
//! Every record stores a checksum of its payload; any mismatch on read
//! is corruption and fails the read. The on-disk field is 8 bytes wide
//! (fixed for schema v1), holding the zero-extended 32-bit CRC.

use crc32fast::Hasher;

/// Computes the checksum over the provided payload bytes.
///
/// Deterministic: the same input always produces the same output.
pub fn compute_checksum(data: &[u8]) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    u64::from(hasher.finalize())
}

/// Verifies that the computed checksum matches the expected value.
pub fn verify_checksum(data: &[u8], expected: u64) -> bool {
    compute_checksum(data) == expected
}
