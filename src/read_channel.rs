//! Checksum-verified random-access reads

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::buffer::JournalBuffer;
use crate::checksum::verify_checksum;
use crate::error::{JournalError, JournalResult};
use crate::header::{RecordHeader, RECORD_HEADER_LEN};
use crate::location::Location;
use crate::metrics::JournalMetrics;

/// A record decoded from the journal file.
///
/// Borrows its payload from the destination buffer the caller supplied,
/// so reading is copy-free past the file read itself.
#[derive(Debug)]
pub struct Record<'a> {
    header: RecordHeader,
    location: Location,
    payload: &'a [u8],
}

impl<'a> Record<'a> {
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Location of the record stored immediately after this one.
    /// Whether a record actually exists there is only known by reading.
    pub fn next_location(&self) -> Location {
        Location::new(
            self.location.offset() + (RECORD_HEADER_LEN + self.payload.len()) as u64,
        )
    }
}

/// Read-only handle over the journal file. Safe to share across
/// threads; each read seeks and reads under an internal lock.
#[derive(Debug)]
pub(crate) struct RecordReadChannel {
    file: Mutex<File>,
    metrics: Arc<JournalMetrics>,
}

impl RecordReadChannel {
    pub(crate) fn open(path: &Path, metrics: Arc<JournalMetrics>) -> JournalResult<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            metrics,
        })
    }

    /// Reads and verifies the record at `location`, placing its payload
    /// into `destination`.
    ///
    /// Fails with `InvalidRecordHeader` when the bytes at `location` do
    /// not start with the record magic, with `NotEnoughSpaceInBuffer`
    /// when the payload exceeds the destination's capacity, and with
    /// `InvalidRecordChecksum` when the stored checksum does not match
    /// the payload read back. Reading past the last record reports a
    /// `ShortRead`.
    pub(crate) fn read_record<'a>(
        &self,
        location: Location,
        destination: &'a mut JournalBuffer,
    ) -> JournalResult<Record<'a>> {
        let mut file = self.file.lock().expect("read channel lock poisoned");

        // A header read that stops short of 16 bytes leaves the array
        // zero-padded and falls through to the magic check, so a torn
        // file tail reports InvalidRecordHeader rather than wrong data.
        // Only an offset entirely past end-of-file is a ShortRead.
        let mut header_bytes = [0u8; RECORD_HEADER_LEN];
        let filled = read_available_at(&mut file, location.offset(), &mut header_bytes)?;
        if filled == 0 {
            return Err(JournalError::ShortRead {
                offset: location.offset(),
                expected: RECORD_HEADER_LEN,
                actual: 0,
            });
        }
        let header = RecordHeader::decode(&header_bytes)?;

        let payload_len = header.payload_len as usize;
        if payload_len > destination.payload_capacity() {
            return Err(JournalError::NotEnoughSpaceInBuffer {
                required: payload_len,
                available: destination.payload_capacity(),
            });
        }

        destination.set_payload_len(payload_len);
        let payload_offset = location.offset() + RECORD_HEADER_LEN as u64;
        read_exact_at(
            &mut file,
            payload_offset,
            &mut destination.payload_region_mut()[..payload_len],
        )?;
        drop(file);

        let payload = destination.payload();
        if !verify_checksum(payload, header.checksum) {
            self.metrics.increment_checksum_failures();
            return Err(JournalError::InvalidRecordChecksum {
                computed: crate::checksum::compute_checksum(payload),
                stored: header.checksum,
            });
        }

        self.metrics.increment_records_read();
        Ok(Record {
            header,
            location,
            payload,
        })
    }
}

/// Reads as many bytes as the file holds at `offset`, up to
/// `buf.len()`, returning the count. End-of-file is not an error here.
fn read_available_at(file: &mut File, offset: u64, buf: &mut [u8]) -> JournalResult<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(JournalError::Io(e)),
        }
    }
    Ok(filled)
}

/// Upper bound on a single payload read syscall; large records span
/// several page reads.
const READ_PAGE_SIZE: usize = 4096;

/// Reads exactly `buf.len()` bytes starting at `offset`, one page at a
/// time. Hitting end-of-file mid-read reports how much was actually
/// available, which distinguishes "no record here" from a torn tail.
fn read_exact_at(file: &mut File, offset: u64, buf: &mut [u8]) -> JournalResult<()> {
    file.seek(SeekFrom::Start(offset))?;
    let expected = buf.len();
    let mut filled = 0usize;
    while filled < expected {
        let page_end = expected.min(filled + READ_PAGE_SIZE);
        match file.read(&mut buf[filled..page_end]) {
            Ok(0) => {
                return Err(JournalError::ShortRead {
                    offset,
                    expected,
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(JournalError::Io(e)),
        }
    }
    Ok(())
}
