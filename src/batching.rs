//! Double-buffered batching write path
//!
//! Many producer threads funnel framed records into one of two
//! long-lived staging batches; a single dedicated flush thread drains
//! full (or awaited) batches to the file. The protocol:
//!
//! - One mutex guards both batches, the active index, and the shared
//!   virtual-position counter that assigns record offsets.
//! - Producers append to the active batch. When it cannot fit the next
//!   record they swap to the other batch, but only if that batch is
//!   empty; otherwise they block until the flush thread drains it.
//!   This bounds the flush queue at depth 1 and is the journal's
//!   backpressure point.
//! - A synchronous producer blocks on its batch's flushed condition,
//!   looping on the batch's flush epoch (condition waits can wake
//!   spuriously and batches are reused).
//! - A short write on the flush thread is fatal: the failure is
//!   recorded, every blocked producer is woken with the error, and the
//!   write path refuses further work.

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::batch::Batch;
use crate::error::{JournalError, JournalResult};
use crate::location::Location;
use crate::metrics::JournalMetrics;
use crate::write_channel::RecordWriteChannel;

/// How long `close` waits for the flush thread before detaching it
/// and attempting the final drain itself.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// State guarded by the single write-path mutex.
#[derive(Debug)]
struct Inner {
    /// Two pre-allocated batches, reused forever
    batches: [Batch; 2],
    /// Index of the batch currently accepting appends
    active: usize,
    /// Monotonic counter assigning record offsets ahead of the
    /// physical flush; seeded from end-of-file at open
    virtual_position: u64,
    /// The file sink; only the flush path writes through it
    channel: RecordWriteChannel,
    /// Set by `close`, checked by producers and the flush loop
    closed: bool,
    /// Fatal flush failure, delivered to every blocked producer
    failure: Option<String>,
}

impl Inner {
    fn has_pending(&self) -> bool {
        !self.batches[0].is_empty() || !self.batches[1].is_empty()
    }
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    /// The flush thread sleeps here until a batch needs draining
    work: Condvar,
    /// Producers sleep here until "their" batch's flush epoch advances
    flushed: [Condvar; 2],
    metrics: Arc<JournalMetrics>,
}

impl Shared {
    /// Drains every non-empty batch to the file, oldest first. Since a
    /// swap only ever targets an empty batch, the non-active batch is
    /// always the older one, so draining it first keeps file contents
    /// in offset order.
    ///
    /// On failure the error is recorded and all waiters are woken; the
    /// write path is unusable afterwards.
    fn drain(&self, inner: &mut MutexGuard<'_, Inner>) -> Result<(), ()> {
        let order = [1 - inner.active, inner.active];
        for idx in order {
            if inner.batches[idx].is_empty() {
                continue;
            }
            let result = {
                let state = &mut **inner;
                state.channel.append(state.batches[idx].filled())
            };
            match result {
                Ok(()) => {
                    self.metrics.add_bytes_flushed(inner.batches[idx].filled().len() as u64);
                    self.metrics.increment_batches_flushed();
                    inner.batches[idx].mark_flushed();
                    self.flushed[idx].notify_all();
                }
                Err(e) => {
                    inner.failure = Some(e.to_string());
                    self.flushed[0].notify_all();
                    self.flushed[1].notify_all();
                    return Err(());
                }
            }
        }
        Ok(())
    }
}

/// Handle to the background flush thread, taken once at shutdown.
#[derive(Debug)]
struct Flusher {
    handle: thread::JoinHandle<()>,
    /// Receives one message when the flush loop exits
    exit_rx: mpsc::Receiver<()>,
}

/// The concurrent write path: two batches, one flush thread.
#[derive(Debug)]
pub(crate) struct DoubleBatch {
    shared: Arc<Shared>,
    flusher: Mutex<Option<Flusher>>,
}

impl DoubleBatch {
    /// Opens the write path over `path`, positioned at end-of-file,
    /// and starts the flush thread.
    pub(crate) fn open(
        path: &Path,
        batch_size: usize,
        metrics: Arc<JournalMetrics>,
    ) -> JournalResult<Self> {
        let channel = RecordWriteChannel::open(path)?;
        let virtual_position = channel.position();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                batches: [Batch::new(batch_size), Batch::new(batch_size)],
                active: 0,
                virtual_position,
                channel,
                closed: false,
                failure: None,
            }),
            work: Condvar::new(),
            flushed: [Condvar::new(), Condvar::new()],
            metrics,
        });

        let (exit_tx, exit_rx) = mpsc::channel();
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("journal-flush".to_string())
            .spawn(move || {
                run_flush_loop(&thread_shared);
                let _ = exit_tx.send(());
            })?;

        Ok(Self {
            shared,
            flusher: Mutex::new(Some(Flusher { handle, exit_rx })),
        })
    }

    /// Appends a framed record, assigning its file offset.
    ///
    /// With `wait_for_flush` the call blocks until the batch holding
    /// the record has been flushed, so durability and visibility to
    /// readers are established before it returns.
    pub(crate) fn write(&self, frame: &[u8], wait_for_flush: bool) -> JournalResult<Location> {
        let mut inner = self.shared.inner.lock().expect("write-path lock poisoned");
        if frame.len() > inner.batches[0].capacity() {
            return Err(JournalError::RecordTooLarge {
                size: frame.len(),
                capacity: inner.batches[0].capacity(),
            });
        }
        loop {
            if inner.closed {
                return Err(JournalError::Closed);
            }
            if let Some(msg) = &inner.failure {
                return Err(JournalError::FlushFailed(msg.clone()));
            }

            let active = inner.active;
            if inner.batches[active].has_remaining(frame.len()) {
                let offset = {
                    let state = &mut *inner;
                    state.batches[active].append(frame, &mut state.virtual_position)
                };
                self.shared.metrics.increment_records_written();
                let epoch = inner.batches[active].flush_epoch();
                if inner.batches[active].is_full() || wait_for_flush {
                    self.shared.work.notify_one();
                }
                if wait_for_flush {
                    while inner.batches[active].flush_epoch() == epoch
                        && inner.failure.is_none()
                    {
                        inner = self
                            .shared
                            .flushed[active]
                            .wait(inner)
                            .expect("write-path lock poisoned");
                    }
                    if let Some(msg) = &inner.failure {
                        return Err(JournalError::FlushFailed(msg.clone()));
                    }
                }
                return Ok(Location::new(offset));
            }

            // The active batch cannot fit the record: swap to the other
            // batch if it has been drained, otherwise wait for the
            // flush thread. Queue depth stays at 1.
            let other = 1 - active;
            if inner.batches[other].is_empty() {
                inner.active = other;
                self.shared.work.notify_one();
                continue;
            }
            let epoch = inner.batches[other].flush_epoch();
            self.shared.work.notify_one();
            while inner.batches[other].flush_epoch() == epoch
                && inner.failure.is_none()
                && !inner.closed
            {
                inner = self
                    .shared
                    .flushed[other]
                    .wait(inner)
                    .expect("write-path lock poisoned");
            }
        }
    }

    /// True once `close` has run or the flush thread has failed.
    pub(crate) fn is_closed(&self) -> bool {
        let inner = self.shared.inner.lock().expect("write-path lock poisoned");
        inner.closed || inner.failure.is_some()
    }

    /// Stops the flush thread and drains any pending batch.
    ///
    /// The thread gets a bounded grace period to finish its final
    /// drain; past that it is detached and the drain is attempted
    /// here, so shutdown never hangs on a wedged flush loop but still
    /// makes the mandatory best-effort final flush.
    pub(crate) fn close(&self) -> JournalResult<()> {
        {
            let mut inner = self.shared.inner.lock().expect("write-path lock poisoned");
            inner.closed = true;
        }
        self.shared.work.notify_all();

        let flusher = self.flusher.lock().expect("flusher handle lock poisoned").take();
        let Some(flusher) = flusher else {
            return Ok(()); // already closed
        };

        match flusher.exit_rx.recv_timeout(SHUTDOWN_GRACE) {
            Ok(()) => {
                let _ = flusher.handle.join();
                let inner = self.shared.inner.lock().expect("write-path lock poisoned");
                if let Some(msg) = &inner.failure {
                    return Err(JournalError::FlushFailed(msg.clone()));
                }
                inner.channel.sync()?;
                Ok(())
            }
            Err(_) => {
                // Flush thread did not exit in time: detach it and make
                // the final drain attempt from here. If it is wedged
                // while holding the lock, skip rather than hang.
                drop(flusher.handle);
                if let Ok(mut inner) = self.shared.inner.try_lock() {
                    if inner.has_pending() && inner.failure.is_none() {
                        let _ = self.shared.drain(&mut inner);
                    }
                    let _ = inner.channel.sync();
                }
                Ok(())
            }
        }
    }
}

/// Body of the dedicated flush thread. Holds the write-path lock
/// except while waiting for work; producers therefore never observe a
/// half-drained batch.
fn run_flush_loop(shared: &Shared) {
    let mut inner = shared.inner.lock().expect("write-path lock poisoned");
    loop {
        while !inner.closed && inner.failure.is_none() && !inner.has_pending() {
            inner = shared.work.wait(inner).expect("write-path lock poisoned");
        }
        if inner.failure.is_some() {
            break;
        }
        if shared.drain(&mut inner).is_err() {
            break;
        }
        if inner.closed && !inner.has_pending() {
            break;
        }
    }
    // Nothing further will be flushed; wake any straggling waiters so
    // they observe the closed flag or the failure.
    inner.closed = true;
    drop(inner);
    shared.flushed[0].notify_all();
    shared.flushed[1].notify_all();
}
