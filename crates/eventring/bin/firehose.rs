//! Saturation driver: many writers flood one consumer through the shared
//! ring and the run reports end-to-end throughput.

use eventring::{Config, Event, EventProcessor};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const EVENTS_PER_WRITER: u64 = 1_000_000;
const BATCH_SIZE: usize = 1024;

struct Payload(u64);

impl Event for Payload {
    fn process(&self) {
        std::hint::black_box(self.0);
    }
}

fn run(num_writers: usize) {
    let total = EVENTS_PER_WRITER * num_writers as u64;
    let processor = Arc::new(EventProcessor::<Payload>::with_config(
        num_writers,
        Config::new(16, 64, true), // 64K slots, metrics on
    ));

    let start = Instant::now();

    let mut writers = Vec::new();
    for _ in 0..num_writers {
        let processor = Arc::clone(&processor);
        writers.push(thread::spawn(move || {
            let mut sent = 0u64;
            while sent < EVENTS_PER_WRITER {
                let want = BATCH_SIZE.min((EVENTS_PER_WRITER - sent) as usize);
                let Some(handle) = processor.reserve_range_with_backoff(want) else {
                    continue;
                };
                let events = processor.reserved_events(handle).unwrap();
                let sequence = events.sequence_number();
                let granted = events.count();
                for i in 0..granted {
                    events.emplace_at(i, Payload(sent + i as u64));
                }
                processor
                    .commit(handle, sequence, granted)
                    .expect("commit of a freshly filled run");
                sent += granted as u64;
            }
            processor.signal_writer_done();
        }));
    }

    processor.process_events();
    for writer in writers {
        writer.join().unwrap();
    }

    let elapsed = start.elapsed();
    let snapshot = processor.metrics();
    assert_eq!(snapshot.events_processed, total);

    let rate = total as f64 / elapsed.as_secs_f64();
    println!(
        "{num_writers:>2} writers | {total:>10} events | {:>8.2?} | {:>6.1} M events/s | {} grants, {} denials",
        elapsed,
        rate / 1e6,
        snapshot.reservations_granted,
        snapshot.reservations_denied,
    );
}

fn main() {
    println!("firehose: range-reserving writers vs one draining consumer");
    for num_writers in [1, 2, 4, 8, 16] {
        run(num_writers);
    }
}
