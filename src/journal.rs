//! Public journal facade
//!
//! Owns the on-disk header lifecycle, the read channel, and the
//! double-buffered write path with its flush thread.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::batching::DoubleBatch;
use crate::buffer::JournalBuffer;
use crate::error::{JournalError, JournalResult};
use crate::header::{JournalHeader, JOURNAL_HEADER_LEN, RECORD_HEADER_LEN};
use crate::location::Location;
use crate::metrics::JournalMetrics;
use crate::read_channel::{Record, RecordReadChannel};

/// Default capacity of each staging batch, in bytes.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// An append-only, crash-tolerant binary journal.
///
/// Records are staged into one of two in-memory batches and flushed by
/// a dedicated background thread; every record carries a checksum that
/// is verified on read. Writes return an opaque [`Location`] that is
/// the only handle for reading the record back.
///
/// All operations take `&self`; a `Journal` can be shared across
/// threads behind an `Arc`.
#[derive(Debug)]
pub struct Journal {
    batch: DoubleBatch,
    reader: RecordReadChannel,
    metrics: Arc<JournalMetrics>,
}

impl Journal {
    /// Opens `path` with [`DEFAULT_BATCH_SIZE`], creating the file and
    /// its header when absent, keeping its contents when present.
    pub fn open_default(path: impl AsRef<Path>) -> JournalResult<Self> {
        Self::open(path, false, DEFAULT_BATCH_SIZE)
    }

    /// Opens a journal at `path`.
    ///
    /// With `truncate` the file is recreated empty; otherwise an
    /// existing file keeps its records and new writes append after
    /// them. An existing file must begin with a valid header, so
    /// opening fails with `TooSmallJournalHeader`,
    /// `InvalidJournalHeader`, or `UnsupportedJournalVersion` when it
    /// does not.
    ///
    /// `batch_size` caps the size of a single framed record; it must
    /// leave room for at least one payload byte past the record
    /// header.
    pub fn open(path: impl AsRef<Path>, truncate: bool, batch_size: usize) -> JournalResult<Self> {
        let path = path.as_ref();
        if batch_size <= RECORD_HEADER_LEN {
            return Err(JournalError::NotEnoughSpaceInBuffer {
                required: RECORD_HEADER_LEN + 1,
                available: batch_size,
            });
        }
        init_file(path, truncate)?;
        let metrics = Arc::new(JournalMetrics::new());
        let batch = DoubleBatch::open(path, batch_size, Arc::clone(&metrics))?;
        let reader = RecordReadChannel::open(path, Arc::clone(&metrics))?;
        Ok(Self {
            batch,
            reader,
            metrics,
        })
    }

    /// Appends the payload staged in `buffer`, waiting until it is
    /// flushed to the file. When this returns, the record is durable
    /// and readable at the returned [`Location`] from any thread.
    pub fn write(&self, buffer: &mut JournalBuffer) -> JournalResult<Location> {
        let frame = buffer.frame()?;
        self.batch.write(frame, true)
    }

    /// Appends the payload staged in `buffer` without waiting for a
    /// flush. The record becomes durable and readable only at the next
    /// flush boundary, whether from batch fullness, a later
    /// synchronous write, or `close`.
    pub fn write_async(&self, buffer: &mut JournalBuffer) -> JournalResult<Location> {
        let frame = buffer.frame()?;
        self.batch.write(frame, false)
    }

    /// Reads the payload stored at `location` into `destination`.
    pub fn read<'a>(
        &self,
        destination: &'a mut JournalBuffer,
        location: Location,
    ) -> JournalResult<&'a [u8]> {
        Ok(self.read_record(destination, location)?.payload())
    }

    /// Reads and verifies the record stored at `location`, exposing
    /// its header and the location of the record after it.
    pub fn read_record<'a>(
        &self,
        destination: &'a mut JournalBuffer,
        location: Location,
    ) -> JournalResult<Record<'a>> {
        if self.batch.is_closed() {
            return Err(JournalError::Closed);
        }
        self.reader.read_record(location, destination)
    }

    /// Location of the first record a sequential scan should start
    /// from, immediately after the journal header.
    pub fn first_location(&self) -> Location {
        Location::new(JOURNAL_HEADER_LEN as u64)
    }

    /// Stops accepting writes, drains pending batches, and syncs the
    /// file. Safe to call more than once.
    pub fn close(&self) -> JournalResult<()> {
        self.batch.close()
    }

    /// True once `close` has run or the write path has failed.
    pub fn is_closed(&self) -> bool {
        self.batch.is_closed()
    }

    /// The journal's operational counters.
    pub fn metrics(&self) -> &JournalMetrics {
        &self.metrics
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        let _ = self.batch.close();
    }
}

/// Ensures `path` exists and starts with a valid journal header.
fn init_file(path: &Path, truncate: bool) -> JournalResult<()> {
    if truncate {
        return write_fresh_header(File::create(path)?);
    }
    let existing_len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return write_fresh_header(File::create(path)?);
        }
        Err(e) => return Err(JournalError::Io(e)),
    };
    if existing_len == 0 {
        return write_fresh_header(OpenOptions::new().write(true).open(path)?);
    }
    if existing_len < JOURNAL_HEADER_LEN as u64 {
        return Err(JournalError::TooSmallJournalHeader { size: existing_len });
    }
    let mut bytes = [0u8; JOURNAL_HEADER_LEN];
    File::open(path)?.read_exact(&mut bytes)?;
    JournalHeader::decode(&bytes)?;
    Ok(())
}

fn write_fresh_header(mut file: File) -> JournalResult<()> {
    file.write_all(&JournalHeader::current().encode())?;
    file.sync_all()?;
    Ok(())
}
