use std::sync::{Arc, Mutex};
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tassi::period::{Mode, Period};
use tassi::TpsCounter;

const NUM_THREADS: usize = 8;
const ITERATIONS_PER_THREAD: usize = 1_000_000;

fn bench_record_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_event");

    group.bench_function(
        BenchmarkId::new(
            "TpsCounter (bucketed)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let counter = Arc::new(TpsCounter::new(Period::Second, Mode::FullAccuracy));
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let counter_clone = Arc::clone(&counter);
                    let handle = thread::spawn(move || {
                        for _ in 0..ITERATIONS_PER_THREAD {
                            black_box(counter_clone.record_event());
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(counter.pending_events().unwrap())
            })
        },
    );

    group.bench_function(
        BenchmarkId::new(
            "Mutex<u64> (single)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let counter = Arc::new(Mutex::new(0u64));
                let mut handles = vec![];

                for _ in 0..NUM_THREADS {
                    let counter_clone = Arc::clone(&counter);
                    let handle = thread::spawn(move || {
                        for _ in 0..ITERATIONS_PER_THREAD {
                            *counter_clone.lock().unwrap() += 1;
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(*counter.lock().unwrap())
            })
        },
    );

    group.finish();
}

criterion_group!(benches, bench_record_event);
criterion_main!(benches);
