use crate::invariants::{
    debug_assert_in_flight_bounded, debug_assert_run_in_bounds, debug_assert_slot_vacant,
};
use crate::{Config, Metrics, MetricsSnapshot};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// One ring is shared by every producer and the single consumer. Slot ownership
// is arbitrated by three pieces of state:
//
// ## Wrapped indices
//
// `read_index` and `write_index` are wrapped indices in `[0, capacity)`.
// `(write - read) mod capacity` counts the in-flight slots: published events
// plus reserved-but-unpublished cells. One slot is always kept vacant so a
// full ring (`capacity - 1` in flight) and an empty ring (`read == write`)
// stay distinguishable.
//
// ## The reservation gate
//
// Range reservations multiplex many producers onto one `write_index`, so they
// are serialized by a single-owner gate (CAS false→true acquire, store false
// release). The gate owner is the only thread that advances `write_index`,
// and it advances it past the whole run *before* any event is stored. The
// single-event `push` path reserves through the same gate; there is no
// gate-bypassing CAS on `write_index`.
//
// ## Per-slot published flags
//
// Because `write_index` runs ahead of the stores, the consumer cannot infer
// slot validity from the indices alone. Each slot carries a `published` flag:
//
// **Publisher:** write the event into the slot, then store `published = true`
// (Release). The consumer's Acquire load of the flag synchronizes with this
// store, so a true flag proves the value is fully initialized.
//
// **Consumer:** load `read_index` (Relaxed, single writer: itself), load
// `write_index` (Acquire, pairs with the reserver's Release), check the flag
// (Acquire), move the value out, clear the flag (Release), advance
// `read_index` (Release, pairs with the reserver's Acquire so granted slots
// are never still being read).
//
// =============================================================================

/// A contiguous run of slots granted by a single reservation.
///
/// `start + len` never exceeds the capacity: a run never straddles the
/// physical buffer end. Producers needing more slots than one grant returned
/// reserve again for the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First slot index of the run.
    pub start: usize,
    /// Number of slots granted (at least 1).
    pub len: usize,
}

/// One ring slot: an occupancy flag plus storage for a single event.
struct Slot<E> {
    /// True once a producer has stored an event here; cleared by the consumer.
    published: AtomicBool,
    value: UnsafeCell<MaybeUninit<E>>,
}

impl<E> Slot<E> {
    fn vacant() -> Self {
        Self {
            published: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Bounded lock-free ring shared by many producers and one consumer.
///
/// Producers obtain contiguous slot runs through [`try_reserve_space`] and
/// publish events into them; the consumer drains in index order with [`pop`].
/// All operations are non-blocking; a failed reservation is retried by the
/// caller.
///
/// [`try_reserve_space`]: Ring::try_reserve_space
/// [`pop`]: Ring::pop
#[repr(C)]
pub struct Ring<E> {
    // === WRITE SIDE === (cache-line padded)
    /// Next slot to reserve (written under the gate, read by the consumer)
    write_index: CachePadded<AtomicUsize>,
    /// Single-owner gate serializing range reservations
    gate: CachePadded<AtomicBool>,

    // === READ SIDE === (cache-line padded)
    /// Next slot to pop (written by the consumer, read by reservers)
    read_index: CachePadded<AtomicUsize>,

    // === COLD STATE ===
    /// Thread-safe metrics (uses atomics internally)
    metrics: Metrics,
    config: Config,

    // === DATA BUFFER ===
    /// Fixed at construction; `Box<[Slot<E>]>` rather than `Vec` since the
    /// ring never grows.
    buffer: Box<[Slot<E>]>,
}

// Safety: Ring is Send + Sync as long as E is Send.
// Slot storage is handed between threads only through the published-flag and
// index protocol described in the module header.
unsafe impl<E: Send> Send for Ring<E> {}
unsafe impl<E: Send> Sync for Ring<E> {}

impl<E> Ring<E> {
    /// Creates a ring with the given configuration.
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();

        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, Slot::vacant);
        let buffer = buffer.into_boxed_slice();

        Self {
            write_index: CachePadded::new(AtomicUsize::new(0)),
            gate: CachePadded::new(AtomicBool::new(false)),
            read_index: CachePadded::new(AtomicUsize::new(0)),
            metrics: Metrics::new(),
            config,
            buffer,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Returns the index mask for wrapping.
    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Wrapped distance from `read` up to `write`.
    #[inline]
    fn in_flight(&self, write: usize, read: usize) -> usize {
        write.wrapping_sub(read) & self.mask()
    }

    /// Returns the number of in-flight slots: published events plus
    /// reserved-but-unpublished cells. Best effort under concurrency.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.write_index.load(Ordering::Relaxed);
        let read = self.read_index.load(Ordering::Relaxed);
        self.in_flight(write, read)
    }

    /// Returns true if no slots are in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_index.load(Ordering::Acquire) == self.write_index.load(Ordering::Acquire)
    }

    /// Returns true if no further slot can be reserved right now.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity() - 1
    }

    /// Instantaneous count of reservable slots. Best effort: concurrent
    /// reservations and pops may change it before the caller acts on it.
    #[inline]
    pub fn free_space(&self) -> usize {
        (self.capacity() - 1).saturating_sub(self.len())
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Reserve a contiguous run of up to `requested` slots.
    ///
    /// **Important:** the grant may be **shorter than requested**. A run never
    /// straddles the physical buffer end, so near the end of the buffer only
    /// the remaining suffix is granted and the producer reserves again for the
    /// remainder (which then starts at slot 0). Always check [`Run::len`].
    ///
    /// Returns `None` when `requested == 0`, when another reserver holds the
    /// gate, or when no slot is free. All three are transient from the
    /// caller's perspective: retry, ideally through a [`Backoff`].
    ///
    /// On success the run's slots are owned by the caller until each is
    /// published; the consumer will not read past an unpublished slot.
    ///
    /// [`Backoff`]: crate::Backoff
    pub fn try_reserve_space(&self, requested: usize) -> Option<Run> {
        if requested == 0 {
            return None;
        }

        if self
            .gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            if self.config.enable_metrics {
                self.metrics.add_reservations_denied(1);
            }
            return None;
        }

        let run = self.grant_run(requested);
        self.gate.store(false, Ordering::Release);

        if self.config.enable_metrics {
            match run {
                Some(_) => self.metrics.add_reservations_granted(1),
                None => self.metrics.add_reservations_denied(1),
            }
        }

        run
    }

    /// Compute and take the next run. Caller must hold the gate.
    fn grant_run(&self, requested: usize) -> Option<Run> {
        let write = self.write_index.load(Ordering::Acquire);
        let read = self.read_index.load(Ordering::Acquire);
        let capacity = self.capacity();

        let available = if write >= read {
            // Run up to the physical end. When the consumer sits at slot 0 the
            // last suffix slot stays vacant, otherwise a full-suffix grant
            // would wrap write_index onto read_index and alias full with empty.
            if read == 0 {
                capacity - write - 1
            } else {
                capacity - write
            }
        } else {
            read - write - 1
        };

        if available == 0 {
            return None;
        }

        let granted = available.min(requested);
        debug_assert_run_in_bounds!(write, granted, capacity);

        let new_write = (write + granted) & self.mask();
        debug_assert_in_flight_bounded!(self.in_flight(new_write, read), capacity);

        // Release: a consumer that observes the advanced index may probe the
        // run's slots, where the published flags keep it out until the stores.
        self.write_index.store(new_write, Ordering::Release);

        Some(Run {
            start: write,
            len: granted,
        })
    }

    /// Store an event into a reserved slot and make it visible to the consumer.
    ///
    /// Slots of a run must be published in index order so the consumer, which
    /// reads in index order, never waits behind a hole.
    ///
    /// # Safety
    ///
    /// `index` must lie inside a run granted by [`Ring::try_reserve_space`] to
    /// this caller, and must not have been published yet.
    pub(crate) unsafe fn publish(&self, index: usize, event: E) {
        debug_assert!(index < self.capacity());
        let slot = &self.buffer[index];

        // SAFETY: per this function's contract the slot is reserved to the
        // caller and unpublished, so neither the consumer nor any other
        // producer touches it until the flag below is set.
        unsafe {
            (*slot.value.get()).write(event);
        }

        // Release: pairs with the consumer's Acquire load of the flag,
        // publishing the value written above.
        let was_published = slot.published.swap(true, Ordering::Release);
        debug_assert_slot_vacant!(was_published, index);
    }

    /// Enqueue a single event (convenience).
    ///
    /// Reserves one slot through the reservation gate and publishes into it;
    /// single-event producers therefore serialize with range reservers instead
    /// of racing them on `write_index`. Returns `false` when the ring is full
    /// **or** the gate is momentarily contended; retry exactly as for a failed
    /// reservation.
    #[inline]
    pub fn push(&self, event: E) -> bool {
        match self.try_reserve_space(1) {
            Some(run) => {
                // SAFETY: the run just granted covers exactly this slot.
                unsafe { self.publish(run.start, event) };
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Dequeue the oldest published event. Single-consumer only.
    ///
    /// Returns `None` when the ring is empty, and also when the oldest
    /// in-flight slot is reserved but not yet published — the reserving
    /// producer has claimed it and will store shortly; the caller retries.
    pub fn pop(&self) -> Option<E> {
        let read = self.read_index.load(Ordering::Relaxed);
        let write = self.write_index.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let slot = &self.buffer[read];
        // Acquire: pairs with the publisher's Release store of the flag.
        if !slot.published.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the published flag proves a producer fully initialized this
        // slot, and only this (single) consumer moves values out.
        let event = unsafe { (*slot.value.get()).assume_init_read() };

        slot.published.store(false, Ordering::Release);
        // Release: pairs with the reserver's Acquire load, so a slot is only
        // ever re-granted after this take completed.
        self.read_index
            .store((read + 1) & self.mask(), Ordering::Release);

        Some(event)
    }

    // ---------------------------------------------------------------------
    // METRICS
    // ---------------------------------------------------------------------

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    #[inline]
    pub(crate) fn metrics_enabled(&self) -> bool {
        self.config.enable_metrics
    }

    #[inline]
    pub(crate) fn raw_metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl<E> Drop for Ring<E> {
    fn drop(&mut self) {
        // Published-but-unpopped events still own their payloads. Walking the
        // whole buffer (rather than [read, write)) also handles runs that were
        // only partially published when the ring died.
        for slot in &mut *self.buffer {
            if *slot.published.get_mut() {
                unsafe {
                    slot.value.get_mut().assume_init_drop();
                }
            }
        }
    }
}
