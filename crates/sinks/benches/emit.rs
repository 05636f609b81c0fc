//! Emission benchmark suite
//!
//! Run with: `cargo bench -p rawfile-sinks --bench emit`
//!
//! # What we measure
//!
//! - Buffer pool get/put cycle
//! - Single-threaded emission, buffered and unbuffered
//! - Emission under contention (lock fast path vs thread-local render)
//! - Rolling sink overhead on top of a single file
//!
//! # Scenarios
//!
//! - Short: 64-byte records
//! - Typical: 200-byte records
//! - Large: 1000-byte records

use std::sync::Arc;
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rawfile_config::{RawFileConfig, RollingInterval};
use rawfile_sinks::util::BufferPool;
use rawfile_sinks::{FileOptions, FileSink, LogSink, RollingFileSink, TextRecord};
use tempfile::TempDir;

const SCENARIOS: &[(&str, usize)] = &[("short", 64), ("typical", 200), ("large", 1000)];

fn record(size: usize) -> TextRecord {
    // Leave room for the trailing newline
    TextRecord::now("x".repeat(size.saturating_sub(1)))
}

// =============================================================================
// Buffer Pool Benchmarks
// =============================================================================

fn bench_buffer_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_pool");
    let pool = BufferPool::new(16 * 1024, 128 * 1024);

    group.bench_function("get_put_cycle", |b| {
        b.iter(|| {
            let buf = pool.get();
            black_box(&buf);
            pool.put(buf);
        });
    });

    group.finish();
}

// =============================================================================
// Single-threaded Emission
// =============================================================================

fn bench_file_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_sink");

    for &(name, size) in SCENARIOS {
        let record = record(size);
        group.throughput(Throughput::Bytes(size as u64));

        for buffered in [false, true] {
            let label = if buffered { "buffered" } else { "unbuffered" };
            let dir = TempDir::new().unwrap();
            let options = FileOptions {
                buffered,
                ..FileOptions::default()
            };
            let sink = FileSink::new(dir.path().join("bench.log"), options, None).unwrap();

            group.bench_with_input(BenchmarkId::new(label, name), &record, |b, record| {
                b.iter(|| sink.emit(black_box(record)).unwrap());
            });

            sink.close().unwrap();
        }
    }

    group.finish();
}

fn bench_rolling_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_sink");
    let (name, size) = SCENARIOS[1];
    let record = record(size);
    group.throughput(Throughput::Bytes(size as u64));

    let dir = TempDir::new().unwrap();
    let config = RawFileConfig::new(dir.path().join("bench-{Date}.log"))
        .with_rolling_interval(RollingInterval::Day)
        .with_buffering();
    let sink = RollingFileSink::new(&config, None).unwrap();

    group.bench_with_input(BenchmarkId::new("daily", name), &record, |b, record| {
        b.iter(|| sink.emit(black_box(record)).unwrap());
    });

    sink.close().unwrap();
    group.finish();
}

// =============================================================================
// Contended Emission
// =============================================================================

/// Each iteration: `threads` threads emit `per_thread` records into one sink
fn bench_contention(c: &mut Criterion) {
    const PER_THREAD: usize = 1_000;

    let mut group = c.benchmark_group("contention");
    group.sample_size(20);
    let (_, size) = SCENARIOS[1];

    for threads in [1usize, 2, 4, 8] {
        let dir = TempDir::new().unwrap();
        let options = FileOptions {
            buffered: true,
            ..FileOptions::default()
        };
        let sink = Arc::new(FileSink::new(dir.path().join("bench.log"), options, None).unwrap());

        group.throughput(Throughput::Elements((threads * PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let sink = Arc::clone(&sink);
                        thread::spawn(move || {
                            let record = record(size);
                            for _ in 0..PER_THREAD {
                                sink.emit(&record).unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });

        sink.close().unwrap();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_pool,
    bench_file_sink,
    bench_rolling_sink,
    bench_contention
);
criterion_main!(benches);
