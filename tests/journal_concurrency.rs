//! Journal Concurrency Tests
//!
//! Many producer threads share one journal. Under contention no record
//! may be lost, duplicated, or corrupted, and every location handed
//! back must read the exact payload that was written.

use quill::{Journal, JournalBuffer, Location};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const PRODUCERS: usize = 4;
const WRITES_PER_PRODUCER: u64 = 64;

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// N producers pull values from a shared counter and write them
/// synchronously; afterwards every location is read back and the
/// values must sum to 0 + 1 + ... + (N*M - 1).
#[test]
fn test_multi_producer_stress_loses_nothing() {
    let temp_dir = create_temp_data_dir();
    let journal =
        Arc::new(Journal::open(temp_dir.path().join("journal.dat"), false, 256).expect("open"));
    let next_value = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for _ in 0..PRODUCERS {
        let journal = Arc::clone(&journal);
        let next_value = Arc::clone(&next_value);
        handles.push(thread::spawn(move || {
            let mut buffer = JournalBuffer::with_payload_capacity(8);
            let mut locations = Vec::new();
            for _ in 0..WRITES_PER_PRODUCER {
                let value = next_value.fetch_add(1, Ordering::Relaxed);
                buffer.clear();
                buffer
                    .put_payload(&value.to_be_bytes())
                    .expect("stage payload");
                locations.push(journal.write(&mut buffer).expect("concurrent write"));
            }
            locations
        }));
    }

    let locations: Vec<Location> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("producer thread panicked"))
        .collect();

    let total = PRODUCERS as u64 * WRITES_PER_PRODUCER;
    assert_eq!(locations.len(), total as usize);

    let mut destination = JournalBuffer::with_payload_capacity(8);
    let mut sum = 0u64;
    for location in &locations {
        let payload = journal
            .read(&mut destination, *location)
            .expect("every written record must read back");
        sum += u64::from_be_bytes(payload.try_into().expect("8-byte payload"));
    }
    assert_eq!(
        sum,
        total * (total - 1) / 2,
        "no record may be lost, duplicated, or corrupted"
    );

    let mut sorted = locations.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), locations.len(), "locations must be unique");

    assert_eq!(journal.metrics().records_written(), total);
    assert_eq!(journal.metrics().records_read(), total);
    assert_eq!(journal.metrics().checksum_failures(), 0);
}

/// A location produced by a synchronous write on one thread is
/// immediately readable on another, with no extra flush in between.
#[test]
fn test_writer_and_reader_on_different_threads() {
    let temp_dir = create_temp_data_dir();
    let journal =
        Arc::new(Journal::open_default(temp_dir.path().join("journal.dat")).expect("open"));

    let (tx, rx) = std::sync::mpsc::channel::<Location>();

    let writer = {
        let journal = Arc::clone(&journal);
        thread::spawn(move || {
            let mut buffer = JournalBuffer::with_payload_capacity(16);
            for i in 0..32u64 {
                buffer.clear();
                buffer.put_payload(&i.to_be_bytes()).expect("stage payload");
                let location = journal.write(&mut buffer).expect("write");
                tx.send(location).expect("reader hung up");
            }
        })
    };

    let reader = {
        let journal = Arc::clone(&journal);
        thread::spawn(move || {
            let mut destination = JournalBuffer::with_payload_capacity(16);
            for i in 0..32u64 {
                let location = rx.recv().expect("writer hung up");
                let payload = journal
                    .read(&mut destination, location)
                    .expect("synchronous write must already be durable");
                assert_eq!(payload, i.to_be_bytes());
            }
        })
    };

    writer.join().expect("writer thread panicked");
    reader.join().expect("reader thread panicked");
}

/// Producers blocked on a full, undrained batch must make progress
/// once the flush thread catches up rather than deadlocking.
#[test]
fn test_backpressure_makes_progress_under_small_batches() {
    let temp_dir = create_temp_data_dir();
    // Batch fits a single 48-byte frame: every second write forces a
    // swap and the flush queue stays at depth 1.
    let journal =
        Arc::new(Journal::open(temp_dir.path().join("journal.dat"), false, 48).expect("open"));

    let mut handles = Vec::new();
    for t in 0..3u8 {
        let journal = Arc::clone(&journal);
        handles.push(thread::spawn(move || {
            let mut buffer = JournalBuffer::with_payload_capacity(32);
            for _ in 0..40 {
                buffer.clear();
                buffer.put_payload(&[t; 32]).expect("stage payload");
                journal.write(&mut buffer).expect("write under backpressure");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("producer thread panicked");
    }

    assert_eq!(journal.metrics().records_written(), 120);
    journal.close().expect("close");
}
