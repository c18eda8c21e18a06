//! Opaque record location handle

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte offset of a record header inside the journal file.
///
/// Produced only by a write, consumed only by a read. Offsets are
/// globally unique and strictly increasing in write-submission order.
/// Serializable only as a bare 64-bit offset, for logging/debugging;
/// the value carries no other meaning to callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Location(u64);

impl Location {
    /// Wraps a raw byte offset.
    pub(crate) fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Raw byte offset of the record header.
    pub fn offset(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.0)
    }
}
