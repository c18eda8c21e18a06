//! File-level sink for flushed batches

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{JournalError, JournalResult};

/// Append-mode file handle performing the actual write syscalls for a
/// flushed batch. Owned exclusively by the flush path.
#[derive(Debug)]
pub(crate) struct RecordWriteChannel {
    file: File,
    /// Bytes written through this channel since open, starting at the
    /// end-of-file position observed at open time.
    position: u64,
}

impl RecordWriteChannel {
    /// Opens the journal file for appending, positioned at end-of-file.
    pub(crate) fn open(path: &Path) -> JournalResult<Self> {
        let file = OpenOptions::new().write(true).append(true).open(path)?;
        let position = file.metadata()?.len();
        Ok(Self { file, position })
    }

    /// Current end-of-file position as seen by this channel.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Writes the filled region of a batch, verifying the written byte
    /// count. A mismatch is fatal: a partial record write corrupts
    /// framing for every subsequent read, so it is never retried.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> JournalResult<()> {
        let expected = bytes.len();
        let mut written = 0usize;
        while written < expected {
            match self.file.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(JournalError::ShortWrite {
                        expected,
                        actual: written,
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(JournalError::Io(e)),
            }
        }
        if written != expected {
            return Err(JournalError::ShortWrite {
                expected,
                actual: written,
            });
        }
        self.position += written as u64;
        Ok(())
    }

    /// Best-effort fsync, used once at close.
    pub(crate) fn sync(&self) -> JournalResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
