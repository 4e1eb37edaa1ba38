use crate::invariants::debug_assert_writers_remaining;
use crate::{
    Backoff, CommitError, Config, Event, MetricsSnapshot, ReservationTable, ReservedEvents, Ring,
};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded lock-free event queue with range reservations.
///
/// Producers reserve contiguous slot runs, construct events in place, and
/// commit them; the single consumer drains the ring with [`process_events`],
/// invoking [`Event::process`] on each event before dropping it.
///
/// The producer lifecycle is `reserve_range` → `reserved_events` /
/// `emplace_at` → `commit`, repeated until done, then `signal_writer_done`.
/// The consumer runs `process_events` to completion: it exits once every
/// writer has signalled done *and* the ring has drained.
///
/// # Example
///
/// ```
/// use eventring::{Event, EventProcessor};
///
/// struct Tick(u64);
/// impl Event for Tick {
///     fn process(&self) {}
/// }
///
/// let processor = EventProcessor::<Tick>::new(1);
///
/// let handle = processor.reserve_range(4).unwrap();
/// let events = processor.reserved_events(handle).unwrap();
/// let sequence = events.sequence_number();
/// let granted = events.count();
/// for i in 0..granted {
///     events.emplace_at(i, Tick(i as u64));
/// }
/// processor.commit(handle, sequence, granted).unwrap();
///
/// processor.signal_writer_done();
/// processor.process_events();
/// ```
///
/// [`process_events`]: EventProcessor::process_events
pub struct EventProcessor<E> {
    ring: Ring<E>,
    reservations: ReservationTable<E>,
    /// Producers still intending to emit events. Reaching zero, together with
    /// an empty ring, is the consumer's termination signal.
    active_writers: CachePadded<AtomicUsize>,
}

impl<E> EventProcessor<E> {
    /// Creates a processor expecting `writer_count` producers, with the
    /// default configuration (4096 slots, 32 reservation handles).
    pub fn new(writer_count: usize) -> Self {
        Self::with_config(writer_count, Config::default())
    }

    /// Creates a processor with a custom configuration.
    pub fn with_config(writer_count: usize, config: Config) -> Self {
        Self {
            ring: Ring::new(config),
            reservations: ReservationTable::new(config.reservation_slots),
            active_writers: CachePadded::new(AtomicUsize::new(writer_count)),
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Reserve up to `requested` contiguous event cells.
    ///
    /// On success a reservation record is live at the returned handle.
    /// **The grant may be shorter than requested** — near the physical buffer
    /// end only the remaining suffix is granted; check
    /// [`ReservedEvents::count`] and reserve again for the remainder.
    ///
    /// Returns `None` when the ring is full, the reservation gate is
    /// contended, or `requested == 0`; all are transient and retried by the
    /// caller.
    pub fn reserve_range(&self, requested: usize) -> Option<usize> {
        let run = self.ring.try_reserve_space(requested)?;
        Some(self.reservations.allocate(run.start as u64, run.len))
    }

    /// [`reserve_range`](Self::reserve_range) with adaptive backoff, giving
    /// up once the backoff's yield budget is spent.
    ///
    /// A denial with free space left means the reservation gate was lost to
    /// another producer, which is worth spinning out; a full ring only the
    /// consumer can fix, so the wait goes straight to yielding.
    pub fn reserve_range_with_backoff(&self, requested: usize) -> Option<usize> {
        let mut backoff = Backoff::new();
        while !backoff.is_exhausted() {
            if let Some(handle) = self.reserve_range(requested) {
                return Some(handle);
            }
            if self.ring.free_space() == 0 {
                backoff.starved();
            } else {
                backoff.contended();
            }
        }
        None
    }

    /// Borrow the reservation record at `handle` to query its geometry and
    /// fill cells via [`ReservedEvents::emplace_at`].
    ///
    /// Returns `None` if the handle has no live record (never allocated, or
    /// already committed).
    #[inline]
    pub fn reserved_events(&self, handle: usize) -> Option<&ReservedEvents<E>> {
        self.reservations.get(handle)
    }

    /// Publish the first `count` events of the reservation at `handle` to the
    /// ring, in cell order, then destroy the record.
    ///
    /// `sequence_number` must be the record's run start (as returned by
    /// [`ReservedEvents::sequence_number`]); it identifies the slots being
    /// published. The commit is validated up front and rejected wholesale on
    /// any [`CommitError`] — nothing is published and the record stays live,
    /// so the caller can correct and retry.
    ///
    /// Committing fewer cells than the record holds releases the record but
    /// leaves the rest of the run's slots unpublished; the consumer will wait
    /// at the first such slot forever. Commit the full grant unless the queue
    /// is being torn down anyway.
    pub fn commit(
        &self,
        handle: usize,
        sequence_number: u64,
        count: usize,
    ) -> Result<(), CommitError> {
        let record = self
            .reservations
            .get(handle)
            .ok_or(CommitError::StaleHandle { handle })?;

        if count > record.count() {
            return Err(CommitError::CountExceedsReservation {
                requested: count,
                reserved: record.count(),
            });
        }
        if sequence_number != record.sequence_number() {
            return Err(CommitError::SequenceMismatch {
                given: sequence_number,
                expected: record.sequence_number(),
            });
        }
        // Validate every cell before publishing any: a commit that fails
        // halfway would tear the run.
        for index in 0..count {
            if !record.is_filled(index) {
                return Err(CommitError::UnfilledCell { index });
            }
        }

        let start = record.sequence_number() as usize;
        for index in 0..count {
            let Some(event) = record.take(index) else {
                return Err(CommitError::UnfilledCell { index });
            };
            // SAFETY: slots [start, start + count) belong to this reservation
            // (the ring advanced write_index past them at grant time) and are
            // published here for the first time, in index order.
            unsafe { self.ring.publish(start + index, event) };
        }

        self.reservations.release(handle);

        if self.ring.metrics_enabled() {
            self.ring.raw_metrics().add_events_committed(count as u64);
            self.ring.raw_metrics().add_batches_committed(1);
        }

        Ok(())
    }

    /// Record that one producer has finished emitting events.
    ///
    /// Release ordering ensures every event this producer committed is
    /// visible to the consumer before it can observe the decrement.
    pub fn signal_writer_done(&self) {
        let previous = self.active_writers.fetch_sub(1, Ordering::Release);
        debug_assert_writers_remaining!(previous);
    }

    /// Account for a dynamically created producer.
    ///
    /// Must happen before the counter can reach zero — call it from a still
    /// active writer or before the consumer starts, otherwise the consumer
    /// may already have terminated.
    pub fn register_writer(&self) {
        self.active_writers.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of producers still active.
    #[inline]
    pub fn active_writers(&self) -> usize {
        self.active_writers.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Ring capacity in slots; at most `capacity - 1` events are in flight.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Instantaneous count of reservable slots. Best effort.
    #[inline]
    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }

    /// Returns true if no events or reservations are in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Get a snapshot of metrics if enabled in the configuration.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ring.metrics()
    }
}

impl<E: Event> EventProcessor<E> {
    /// Consumer entry point: drain the ring, invoking [`Event::process`] on
    /// each event, until every writer has signalled done and the ring is
    /// empty. Single-consumer: run this on exactly one thread.
    ///
    /// The loop never blocks. Between failed polls it waits through
    /// [`Backoff`], and it re-polls rather than exiting whenever slots are
    /// reserved but not yet published — those events are owed to us by a
    /// producer that has not signalled done yet.
    pub fn process_events(&self) {
        let mut backoff = Backoff::new();

        loop {
            if let Some(event) = self.ring.pop() {
                event.process();
                drop(event);

                if self.ring.metrics_enabled() {
                    self.ring.raw_metrics().add_events_processed(1);
                }
                backoff.reset();
                continue;
            }

            // Writer count first (Acquire), then emptiness: events committed
            // before a producer's final Release decrement are observed before
            // both checks can pass.
            if self.active_writers.load(Ordering::Acquire) == 0 && self.ring.is_empty() {
                return;
            }

            if self.ring.is_empty() {
                // Nothing committed yet; only a producer can change that.
                backoff.starved();
            } else {
                // A hole: the next slot's publisher is mid-commit.
                backoff.contended();
            }
        }
    }
}
