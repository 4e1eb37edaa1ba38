/// Configuration for the ring and the reservation table.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring capacity as a power of 2 (default: 12 = 4096 slots)
    pub ring_bits: u8,
    /// Number of reservation-table slots (default: 32)
    pub reservation_slots: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `ring_bits` is greater than 20 (1M slots max) to prevent excessive
    /// memory usage. Panics if `reservation_slots` is 0 or greater than 4096.
    pub const fn new(ring_bits: u8, reservation_slots: usize, enable_metrics: bool) -> Self {
        assert!(
            ring_bits > 0 && ring_bits <= 20,
            "ring_bits must be between 1 and 20 (max 1M slots)"
        );
        assert!(
            reservation_slots > 0 && reservation_slots <= 4096,
            "reservation_slots must be between 1 and 4096"
        );

        Self {
            ring_bits,
            reservation_slots,
            enable_metrics,
        }
    }

    /// Returns the capacity of the ring buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }

    /// Returns the largest run a single reservation can grant.
    ///
    /// One slot is always kept vacant to distinguish a full ring from an
    /// empty one, so this is `capacity - 1`.
    #[inline]
    pub const fn max_in_flight(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_bits: 12, // 4096 slots
            reservation_slots: 32,
            enable_metrics: false,
        }
    }
}

/// Small footprint configuration (256 slots, fits in L1 cache)
pub const SMALL_FOOTPRINT_CONFIG: Config = Config::new(8, 16, false);

/// High throughput configuration (64K slots, 64 reservation slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(16, 64, false);
