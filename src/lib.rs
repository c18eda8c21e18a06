//! quill - An append-only, crash-tolerant binary journal
//!
//! Records are framed with a checksummed header, staged through a
//! double-buffered batching write path with a dedicated flush thread,
//! and read back by opaque [`Location`] handles.

pub mod buffer;
pub mod checksum;
pub mod error;
pub mod header;
pub mod journal;
pub mod location;
pub mod metrics;
pub mod read_channel;

mod batch;
mod batching;
mod write_channel;

pub use buffer::JournalBuffer;
pub use error::{JournalError, JournalResult};
pub use journal::{Journal, DEFAULT_BATCH_SIZE};
pub use location::Location;
pub use metrics::{JournalMetrics, MetricsSnapshot};
pub use read_channel::Record;
