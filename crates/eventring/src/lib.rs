//! eventring - Bounded Lock-Free Event Queue
//!
//! Many producers, one consumer, one shared ring. Producers reserve
//! contiguous runs of slots, construct events in place, and publish the run;
//! the consumer drains the ring in index order and invokes each event's
//! processing hook. No locks on the hot path: slot ownership is arbitrated by
//! atomic indices, per-slot published flags, and a single-owner reservation
//! gate.
//!
//! # Key Features
//!
//! - Zero-copy reserve/emplace/commit API (events are built in their slots)
//! - Contiguous range grants: a run never straddles the buffer end, partial
//!   grants are retried for the remainder
//! - Writer-active accounting: the consumer terminates exactly when every
//!   producer has signalled done and the ring has drained
//! - Two-mode backoff: gate contention is spun out, full/empty stalls yield
//!   to the thread that can fix them
//! - Cache-line padded hot indices (prefetcher false sharing elimination)
//!
//! # Example
//!
//! ```
//! use eventring::{Event, EventProcessor};
//!
//! struct Notice(&'static str);
//!
//! impl Event for Notice {
//!     fn process(&self) {
//!         println!("{}", self.0);
//!     }
//! }
//!
//! // One producer, one consumer.
//! let processor = EventProcessor::<Notice>::new(1);
//!
//! // Reserve a run, fill it in place, commit.
//! let handle = processor.reserve_range(2).unwrap();
//! let events = processor.reserved_events(handle).unwrap();
//! let sequence = events.sequence_number();
//! events.emplace_at(0, Notice("hello"));
//! events.emplace_at(1, Notice("world"));
//! processor.commit(handle, sequence, 2).unwrap();
//!
//! // Drain: returns once writers are done and the ring is empty.
//! processor.signal_writer_done();
//! processor.process_events();
//! ```

mod backoff;
mod config;
mod error;
mod event;
mod invariants;
mod metrics;
mod processor;
mod reservation;
mod ring;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, SMALL_FOOTPRINT_CONFIG};
pub use error::CommitError;
pub use event::Event;
pub use metrics::{Metrics, MetricsSnapshot};
pub use processor::EventProcessor;
pub use reservation::{ReservationTable, ReservedEvents};
pub use ring::{Ring, Run};
