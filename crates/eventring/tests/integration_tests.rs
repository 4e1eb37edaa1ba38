use eventring::{Config, Event, EventProcessor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Event that appends its value to a shared log on processing.
struct Logged {
    value: u64,
    log: Arc<Mutex<Vec<u64>>>,
}

impl Event for Logged {
    fn process(&self) {
        self.log.lock().unwrap().push(self.value);
    }
}

/// Event that bumps shared counters on processing.
struct Counted {
    value: u64,
    sum: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Event for Counted {
    fn process(&self) {
        self.sum.fetch_add(self.value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Emit `values` through the processor, reserving and committing in runs of
/// whatever the ring grants.
fn emit_all<E: Event, F: Fn(u64) -> E>(processor: &EventProcessor<E>, values: &[u64], make: F) {
    let mut next = 0;
    while next < values.len() {
        let Some(handle) = processor.reserve_range_with_backoff(values.len() - next) else {
            thread::yield_now();
            continue;
        };
        let events = processor.reserved_events(handle).unwrap();
        let sequence = events.sequence_number();
        let granted = events.count();
        for i in 0..granted {
            events.emplace_at(i, make(values[next + i]));
        }
        processor.commit(handle, sequence, granted).unwrap();
        next += granted;
    }
}

#[test]
fn test_single_producer_fifo() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let processor = Arc::new(EventProcessor::<Logged>::new(1));

    let producer = {
        let processor = Arc::clone(&processor);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let values: Vec<u64> = (0..10).collect();
            emit_all(&processor, &values, |value| Logged {
                value,
                log: Arc::clone(&log),
            });
            processor.signal_writer_done();
        })
    };

    processor.process_events();
    producer.join().unwrap();

    assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
    assert!(processor.is_empty());
}

#[test]
fn test_wrap_splits_reservation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    // 8 slots.
    let processor = EventProcessor::<Logged>::with_config(1, Config::new(3, 8, false));

    // Commit 6 events and drain them so the indices sit at slot 6.
    let values: Vec<u64> = (0..6).collect();
    emit_all(&processor, &values, |value| Logged {
        value,
        log: Arc::clone(&log),
    });
    processor.signal_writer_done();
    processor.process_events();
    processor.register_writer();

    // Only 2 slots remain before the physical end: the first grant stops
    // there and the retry starts over at slot 0.
    let first = processor.reserve_range(5).unwrap();
    let first_events = processor.reserved_events(first).unwrap();
    assert_eq!(first_events.sequence_number(), 6);
    assert_eq!(first_events.count(), 2);

    let second = processor.reserve_range(3).unwrap();
    let second_events = processor.reserved_events(second).unwrap();
    assert_eq!(second_events.sequence_number(), 0);
    assert_eq!(second_events.count(), 3);

    for (i, value) in (6..8).enumerate() {
        first_events.emplace_at(
            i,
            Logged {
                value,
                log: Arc::clone(&log),
            },
        );
    }
    for (i, value) in (8..11).enumerate() {
        second_events.emplace_at(
            i,
            Logged {
                value,
                log: Arc::clone(&log),
            },
        );
    }
    processor.commit(first, 6, 2).unwrap();
    processor.commit(second, 0, 3).unwrap();

    processor.signal_writer_done();
    processor.process_events();
    assert_eq!(*log.lock().unwrap(), (0..11).collect::<Vec<_>>());
}

#[test]
fn test_full_ring_blocks_reservations_until_pop() {
    let log = Arc::new(Mutex::new(Vec::new()));
    // 8 slots: at most 7 events in flight.
    let processor = EventProcessor::<Logged>::with_config(1, Config::new(3, 8, false));

    let values: Vec<u64> = (0..7).collect();
    emit_all(&processor, &values, |value| Logged {
        value,
        log: Arc::clone(&log),
    });

    assert_eq!(processor.free_space(), 0);
    assert!(processor.reserve_range(1).is_none());

    // Draining reopens the ring.
    processor.signal_writer_done();
    processor.process_events();
    processor.register_writer();

    let handle = processor.reserve_range(1).unwrap();
    let events = processor.reserved_events(handle).unwrap();
    assert_eq!(events.count(), 1);
    events.emplace_at(
        0,
        Logged {
            value: 7,
            log: Arc::clone(&log),
        },
    );
    processor.commit(handle, events.sequence_number(), 1).unwrap();

    processor.signal_writer_done();
    processor.process_events();
    assert_eq!(*log.lock().unwrap(), (0..8).collect::<Vec<_>>());
}

#[test]
fn test_racing_reservers_get_disjoint_runs() {
    let sum = Arc::new(AtomicU64::new(0));
    let count = Arc::new(AtomicU64::new(0));
    // 16 slots: both reservations must fit simultaneously.
    let processor = Arc::new(EventProcessor::<Counted>::with_config(
        2,
        Config::new(4, 8, false),
    ));

    let mut producers = Vec::new();
    let runs = Arc::new(Mutex::new(Vec::new()));
    for p in 0..2u64 {
        let processor = Arc::clone(&processor);
        let sum = Arc::clone(&sum);
        let count = Arc::clone(&count);
        let runs = Arc::clone(&runs);
        producers.push(thread::spawn(move || {
            let handle = loop {
                if let Some(handle) = processor.reserve_range_with_backoff(4) {
                    break handle;
                }
            };
            let events = processor.reserved_events(handle).unwrap();
            let sequence = events.sequence_number();
            let granted = events.count();
            assert_eq!(granted, 4, "16 slots fit both runs in full");
            runs.lock().unwrap().push((sequence, granted));

            for i in 0..granted {
                events.emplace_at(
                    i,
                    Counted {
                        value: p * 100 + i as u64,
                        sum: Arc::clone(&sum),
                        count: Arc::clone(&count),
                    },
                );
            }
            processor.commit(handle, sequence, granted).unwrap();
            processor.signal_writer_done();
        }));
    }

    processor.process_events();
    for producer in producers {
        producer.join().unwrap();
    }

    // The gate serialized the grants into disjoint runs.
    let runs = runs.lock().unwrap();
    assert_eq!(runs.len(), 2);
    let (a_start, a_len) = runs[0];
    let (b_start, b_len) = runs[1];
    assert!(
        a_start + a_len as u64 <= b_start || b_start + b_len as u64 <= a_start,
        "runs overlap: [{a_start}, +{a_len}) and [{b_start}, +{b_len})"
    );

    // All 8 events accounted for, none fabricated or duplicated.
    assert_eq!(count.load(Ordering::Relaxed), 8);
    assert_eq!(sum.load(Ordering::Relaxed), (0..4).sum::<u64>() * 2 + 100 * 4);
}

#[test]
fn test_oversubscribed_request_grants_capacity_minus_one() {
    let processor = EventProcessor::<Logged>::with_config(1, Config::new(4, 8, false));

    let handle = processor.reserve_range(100).unwrap();
    let events = processor.reserved_events(handle).unwrap();
    assert_eq!(events.count(), 15);
    assert_eq!(events.sequence_number(), 0);
    assert_eq!(processor.free_space(), 0);
}

#[test]
fn test_consumer_started_after_writers_finish_drains_everything() {
    let sum = Arc::new(AtomicU64::new(0));
    let count = Arc::new(AtomicU64::new(0));
    let processor = Arc::new(EventProcessor::<Counted>::new(1));

    // The producer commits 1000 events and signals done before the consumer
    // ever runs.
    let values: Vec<u64> = (0..1000).collect();
    emit_all(&processor, &values, |value| Counted {
        value,
        sum: Arc::clone(&sum),
        count: Arc::clone(&count),
    });
    processor.signal_writer_done();

    let consumer = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || processor.process_events())
    };
    consumer.join().unwrap();

    assert_eq!(count.load(Ordering::Relaxed), 1000);
    assert_eq!(sum.load(Ordering::Relaxed), (0..1000).sum::<u64>());
    assert!(processor.is_empty());
}

#[test]
fn test_multi_producer_totals() {
    const N_PRODUCERS: usize = 4;
    const EVENTS_PER_PRODUCER: u64 = 5_000;

    let sum = Arc::new(AtomicU64::new(0));
    let count = Arc::new(AtomicU64::new(0));
    let processor = Arc::new(EventProcessor::<Counted>::with_config(
        N_PRODUCERS,
        Config::new(8, 32, false),
    ));

    let mut producers = Vec::new();
    for _ in 0..N_PRODUCERS {
        let processor = Arc::clone(&processor);
        let sum = Arc::clone(&sum);
        let count = Arc::clone(&count);
        producers.push(thread::spawn(move || {
            let values: Vec<u64> = (0..EVENTS_PER_PRODUCER).collect();
            emit_all(&processor, &values, |value| Counted {
                value,
                sum: Arc::clone(&sum),
                count: Arc::clone(&count),
            });
            processor.signal_writer_done();
        }));
    }

    processor.process_events();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(
        count.load(Ordering::Relaxed),
        N_PRODUCERS as u64 * EVENTS_PER_PRODUCER
    );
    assert_eq!(
        sum.load(Ordering::Relaxed),
        N_PRODUCERS as u64 * (0..EVENTS_PER_PRODUCER).sum::<u64>()
    );
    assert!(processor.is_empty());
}

#[test]
fn test_per_producer_commit_order_is_preserved() {
    const N_PRODUCERS: usize = 3;
    const EVENTS_PER_PRODUCER: u64 = 2_000;

    /// Event that checks its producer's sequence advances monotonically.
    struct Sequenced {
        producer: usize,
        seq: u64,
        last_seen: Arc<Vec<AtomicU64>>,
    }

    impl Event for Sequenced {
        fn process(&self) {
            let previous = self.last_seen[self.producer].swap(self.seq + 1, Ordering::Relaxed);
            assert_eq!(
                previous, self.seq,
                "producer {} events reordered: expected {}, got {}",
                self.producer, previous, self.seq
            );
        }
    }

    let last_seen: Arc<Vec<AtomicU64>> =
        Arc::new((0..N_PRODUCERS).map(|_| AtomicU64::new(0)).collect());
    let processor = Arc::new(EventProcessor::<Sequenced>::with_config(
        N_PRODUCERS,
        Config::new(6, 32, false),
    ));

    let mut producers = Vec::new();
    for producer in 0..N_PRODUCERS {
        let processor = Arc::clone(&processor);
        let last_seen = Arc::clone(&last_seen);
        producers.push(thread::spawn(move || {
            let values: Vec<u64> = (0..EVENTS_PER_PRODUCER).collect();
            emit_all(&processor, &values, |seq| Sequenced {
                producer,
                seq,
                last_seen: Arc::clone(&last_seen),
            });
            processor.signal_writer_done();
        }));
    }

    processor.process_events();
    for producer in producers {
        producer.join().unwrap();
    }

    for (producer, seen) in last_seen.iter().enumerate() {
        assert_eq!(
            seen.load(Ordering::Relaxed),
            EVENTS_PER_PRODUCER,
            "producer {producer} lost events"
        );
    }
}
